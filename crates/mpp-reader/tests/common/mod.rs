pub mod mpp_fixture_builder;
