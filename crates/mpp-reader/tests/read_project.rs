use std::io::Write;

use mpp_model::{
    Assignment, Calendar, CalendarDay, Duration, FileGeneration, IgnoredError, ProjectFile,
    ProjectListener, Relation, RelationType, Resource, ResourceType, Task, TimeUnit,
};
use mpp_reader::{read_mpp_bytes, read_mpp_path, read_mpp_with_listener, ReadError, ReadOptions};
use pretty_assertions::assert_eq;

mod common;

use common::mpp_fixture_builder::{at, password_flag, sample_project, stocktake, utf16, MppFixture};

fn read_fixture(fixture: &MppFixture, options: &ReadOptions) -> ProjectFile {
    let mut tmp = tempfile::NamedTempFile::new().expect("temp file");
    tmp.write_all(&fixture.to_cfb_bytes()).expect("write mpp bytes");
    read_mpp_path(tmp.path(), options).expect("read mpp")
}

fn hours(segments: &[mpp_model::TimephasedWork]) -> Vec<f64> {
    segments.iter().map(|s| s.total_amount.value).collect()
}

#[test]
fn reads_every_entity_of_a_compound_file() {
    let project = read_fixture(&sample_project(), &ReadOptions::default());

    assert_eq!(project.properties.generation, FileGeneration::Mpp14);
    assert_eq!(project.properties.default_calendar_name.as_deref(), Some("Standard"));
    assert!(project.ignored_errors.is_empty(), "{:?}", project.ignored_errors);

    let calendars: Vec<(i32, Option<&str>, Option<i32>)> = project
        .calendars
        .iter()
        .map(|c| (c.unique_id, c.name.as_deref(), c.parent_unique_id))
        .collect();
    assert_eq!(calendars, vec![(1, Some("Standard"), None), (3, None, Some(1))]);

    let tasks: Vec<(i32, Option<i32>, Option<&str>, bool)> = project
        .tasks
        .iter()
        .map(|t| (t.unique_id, t.id, t.name.as_deref(), t.null))
        .collect();
    assert_eq!(
        tasks,
        vec![
            (2, Some(1), Some("Build"), false),
            (1, Some(2), Some("Design"), false),
            (3, Some(3), None, true),
        ]
    );

    assert_eq!(project.resources.len(), 1);
    let alice = &project.resources[0];
    assert_eq!(alice.name.as_deref(), Some("Alice"));
    assert_eq!(alice.calendar_unique_id, Some(3));
    assert_eq!(alice.resource_type, Some(ResourceType::Work));
    assert_eq!(alice.max_units, Some(100.0));

    let assignments: Vec<(i32, i32, Option<i32>)> = project
        .assignments
        .iter()
        .map(|a| (a.unique_id, a.task_unique_id, a.resource_unique_id))
        .collect();
    assert_eq!(assignments, vec![(1, 1, Some(1)), (2, 2, None)]);
    assert_eq!(project.assignments[1].notes.as_deref(), Some("Order steel"));
    assert_eq!(project.assignments[0].work, Some(Duration::hours(10.0)));

    assert_eq!(project.relations.len(), 1);
    let relation = &project.relations[0];
    assert_eq!(
        (relation.predecessor_unique_id, relation.successor_unique_id),
        (1, 2)
    );
    assert_eq!(relation.relation_type, RelationType::FinishStart);
    assert_eq!(relation.lag, Duration::new(1.0, TimeUnit::Days));
}

#[test]
fn bytes_and_paths_decode_alike() {
    let fixture = sample_project();
    let from_path = read_fixture(&fixture, &ReadOptions::default());
    let from_bytes = read_mpp_bytes(&fixture.to_cfb_bytes(), &ReadOptions::default()).expect("read mpp bytes");
    assert_eq!(
        serde_json::to_value(&from_path).expect("json"),
        serde_json::to_value(&from_bytes).expect("json")
    );
}

#[test]
fn exceptions_and_inherited_days_resolve_on_derived_calendars() {
    let project = read_fixture(&sample_project(), &ReadOptions::default());

    let base = project.calendar_by_unique_id(1).expect("base calendar");
    assert_eq!(base.exceptions.len(), 1);
    assert_eq!(base.exceptions[0].from, stocktake());
    assert_eq!(base.exceptions[0].to, stocktake());
    assert_eq!(base.exceptions[0].name.as_deref(), Some("Stocktake"));
    assert!(base.exceptions[0].ranges.is_empty());
    assert_eq!(base.days[1], CalendarDay::standard());
    assert_eq!(base.days[0], CalendarDay::non_working());

    let derived = project.calendar_by_unique_id(3).expect("resource calendar");
    assert_eq!(derived.resource_unique_id, Some(1));
    assert!(derived.days.iter().all(|day| *day == CalendarDay::inherited()));

    let resolved = derived.resolve(Some(base));
    assert!(!resolved.is_working_date(stocktake()));
    assert!(resolved.is_working_date(stocktake().succ_opt().expect("next day")));
}

#[test]
fn completed_curve_is_placed_on_the_resource_calendar() {
    let project = read_fixture(&sample_project(), &ReadOptions::default());
    let assignment = &project.assignments[0];
    let complete = &assignment.timephased.complete_work;

    assert_eq!(hours(complete), vec![4.0, 4.0, 2.0]);
    let starts: Vec<_> = complete.iter().map(|s| s.start).collect();
    assert_eq!(starts, vec![at(8, 8, 0), at(8, 9, 0), at(8, 10, 0)]);
    assert_eq!(complete[0].finish, at(8, 9, 0));
    assert_eq!(complete[2].finish, at(10, 17, 0));
    assert!(assignment.timephased.planned_work.is_empty());
}

#[test]
fn baseline_without_segment_tiers_is_absent() {
    let project = read_fixture(&sample_project(), &ReadOptions::default());
    let timephased = &project.assignments[0].timephased;
    assert_eq!(timephased.baseline_work[0], None);
    assert!(timephased.baseline_cost.iter().all(Option::is_none));
}

#[test]
fn assignment_without_curves_is_spread_over_working_days() {
    let project = read_fixture(&sample_project(), &ReadOptions::default());
    let planned = &project.assignments[1].timephased.planned_work;

    // Tuesday is a calendar exception, so sixteen hours span Monday and Wednesday.
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].start, at(8, 8, 0));
    assert_eq!(planned[0].finish, at(10, 17, 0));
    assert_eq!(planned[0].total_amount, Duration::hours(16.0));
    assert_eq!(planned[0].amount_per_day, Duration::hours(8.0));
}

#[test]
fn timephased_curves_can_be_skipped() {
    let options = ReadOptions {
        read_timephased: false,
        ..ReadOptions::default()
    };
    let project = read_fixture(&sample_project(), &options);
    assert_eq!(project.assignments.len(), 2);
    assert!(project.assignments.iter().all(|a| a.timephased.is_empty()));
}

#[test]
fn missing_project_directory_is_reported() {
    let mut source = MppFixture::new().to_source();
    let err = read_mpp_with_listener(&mut source, &ReadOptions::default(), &mut ()).unwrap_err();
    assert!(matches!(err, ReadError::MissingStorage(ref dir) if dir == "/   114"), "{err:?}");
}

#[test]
fn password_protected_files_are_refused() {
    let mut fixture = sample_project();
    fixture.project_props(&[password_flag(), (37748750, utf16("Standard"))]);

    let err = read_mpp_bytes(&fixture.to_cfb_bytes(), &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, ReadError::PasswordProtected), "{err:?}");

    let options = ReadOptions {
        allow_password_protected: true,
        ..ReadOptions::default()
    };
    let project = read_fixture(&fixture, &options);
    assert!(project.properties.password_protected);
    assert_eq!(project.tasks.len(), 3);
}

#[test]
fn files_without_calendars_or_relations_still_read() {
    let mut fixture = sample_project();
    fixture.remove_storage("TBkndCal").remove_storage("TBkndCons");
    let mut source = fixture.to_source();
    let project = read_mpp_with_listener(&mut source, &ReadOptions::default(), &mut ()).expect("read mpp");

    assert_eq!(project.calendars.len(), 1);
    assert_eq!(project.calendars[0].name.as_deref(), Some("Standard"));
    assert!(project.relations.is_empty());
    assert_eq!(project.resources[0].calendar_unique_id, None);

    // Without the exception the flat curve covers Monday to Wednesday evenly.
    let planned = &project.assignments[1].timephased.planned_work;
    assert_eq!(planned[0].total_amount, Duration::hours(16.0));
    assert!((planned[0].amount_per_day.value - 16.0 / 3.0).abs() < 1e-9);
}

#[test]
fn missing_task_streams_are_fatal() {
    let mut fixture = sample_project();
    fixture.remove_storage("TBkndTask");
    let mut source = fixture.to_source();
    let err = read_mpp_with_listener(&mut source, &ReadOptions::default(), &mut ()).unwrap_err();
    assert!(matches!(err, ReadError::MissingStream(ref path) if path.contains("TBkndTask")), "{err:?}");
}

/// Records the order in which entities are announced.
#[derive(Default)]
struct Announced {
    events: Vec<String>,
}

impl ProjectListener for Announced {
    fn calendar_read(&mut self, calendar: &Calendar) {
        self.events.push(format!("calendar {}", calendar.unique_id));
    }
    fn task_read(&mut self, task: &Task) {
        self.events.push(format!("task {}", task.unique_id));
    }
    fn resource_read(&mut self, resource: &Resource) {
        self.events.push(format!("resource {}", resource.unique_id));
    }
    fn assignment_read(&mut self, assignment: &Assignment) {
        self.events.push(format!("assignment {}", assignment.unique_id));
    }
    fn relation_read(&mut self, relation: &Relation) {
        self.events.push(format!(
            "relation {}->{}",
            relation.predecessor_unique_id, relation.successor_unique_id
        ));
    }
    fn error_ignored(&mut self, error: &IgnoredError) {
        self.events.push(format!("error {error}"));
    }
}

#[test]
fn entities_are_announced_stage_by_stage() {
    let mut source = sample_project().to_source();
    let mut announced = Announced::default();
    read_mpp_with_listener(&mut source, &ReadOptions::default(), &mut announced).expect("read mpp");
    assert_eq!(
        announced.events,
        vec![
            "calendar 1",
            "calendar 3",
            "task 2",
            "task 1",
            "task 3",
            "resource 1",
            "assignment 1",
            "assignment 2",
            "relation 1->2",
        ]
    );
}

#[test]
fn a_failed_read_has_already_announced_earlier_stages() {
    let mut fixture = sample_project();
    fixture.remove_storage("TBkndAssn");
    let mut source = fixture.to_source();
    let mut announced = Announced::default();
    let err = read_mpp_with_listener(&mut source, &ReadOptions::default(), &mut announced).unwrap_err();

    assert!(matches!(err, ReadError::MissingStream(ref path) if path.contains("TBkndAssn")), "{err:?}");
    assert_eq!(
        announced.events,
        vec!["calendar 1", "calendar 3", "task 2", "task 1", "task 3", "resource 1"]
    );
}

#[test]
fn ignored_errors_are_announced_with_their_stage() {
    let mut fixture = sample_project();
    // A sub-project table whose first entry pointer lies past its end.
    let mut table = vec![0u8; 8];
    table.extend_from_slice(&1000i32.to_le_bytes());
    fixture.project_props(&[(37748750, utf16("Standard")), (37748898, table)]);
    let mut source = fixture.to_source();
    let mut announced = Announced::default();
    let project = read_mpp_with_listener(&mut source, &ReadOptions::default(), &mut announced).expect("read mpp");

    assert_eq!(project.ignored_errors.len(), 1);
    assert!(project.sub_projects.is_empty());
    let error = announced.events.iter().position(|e| e.starts_with("error ")).expect("announced error");
    let last_task = announced.events.iter().position(|e| e == "task 3").expect("task 3");
    let first_resource = announced.events.iter().position(|e| e == "resource 1").expect("resource 1");
    assert!(last_task < error && error < first_resource, "{:?}", announced.events);
}
