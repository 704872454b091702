//! Raw block store: read-only views over the fixed-record and variable-blob streams
//! each entity storage is made of.

pub(crate) mod bytes;
pub(crate) mod fixed_data;
pub(crate) mod fixed_meta;
pub(crate) mod props;
pub(crate) mod var_data;
pub(crate) mod var_meta;

pub(crate) use fixed_data::FixedData;
pub(crate) use fixed_meta::FixedMeta;
pub(crate) use props::Props;
pub(crate) use var_data::VarData;
pub(crate) use var_meta::{VarKeyWidth, VarMeta};

/// Stream names inside every entity storage.
pub(crate) const VAR_META: &str = "VarMeta";
pub(crate) const VAR2_DATA: &str = "Var2Data";
pub(crate) const FIXED_META: &str = "FixedMeta";
pub(crate) const FIXED_DATA: &str = "FixedData";
pub(crate) const FIXED2_META: &str = "Fixed2Meta";
pub(crate) const FIXED2_DATA: &str = "Fixed2Data";
pub(crate) const PROPS: &str = "Props";
