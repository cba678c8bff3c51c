//! Tests for the commands behind the CLI

mod common;

use indoc::indoc;
use spectag::commands::{self, ProcessOptions, Project};
use spectag::output::{OutputFormat, render_history, render_process};
use spectag_core::ItemKind;

#[test]
fn test_process_rewrites_project() {
    let temp = common::create_temp_project();
    let project = Project::open(temp.path(), None).unwrap();

    let outcome = commands::process(&project, &ProcessOptions::default()).unwrap();
    assert!(outcome.is_passing());
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.updated(), 2);

    let written = std::fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    assert_eq!(
        written,
        indoc! {r#"
            // <spec fn="get_balance" fork="electra">
            // def get_balance(state: BeaconState, index: ValidatorIndex) -> Gwei:
            //     return state.balances[index]
            // </spec>
            pub fn get_balance() {}

            // <spec ssz_object="Withdrawal" fork="electra" style="diff">
            // --- capella
            // +++ electra
            // @@ -1,3 +1,4 @@
            //  class Withdrawal(Container):
            //      index: WithdrawalIndex
            // +    validator_index: ValidatorIndex
            //      amount: Gwei
            // </spec>
            pub struct Withdrawal;
        "#}
    );

    // a second run finds nothing to do
    let outcome = commands::process(&project, &ProcessOptions::default()).unwrap();
    assert_eq!(outcome.updated(), 0);
    assert_eq!(outcome.changed_files().count(), 0);
}

#[test]
fn test_check_does_not_write() {
    let temp = common::create_temp_project();
    let project = Project::open(temp.path(), None).unwrap();

    let options = ProcessOptions {
        paths: vec![temp.path().join("src/lib.rs")],
        check: true,
    };
    let outcome = commands::process(&project, &options).unwrap();
    assert!(!outcome.is_passing());
    assert_eq!(outcome.changed_files().count(), 1);

    let untouched = std::fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    assert_eq!(untouched, common::SOURCE);
}

#[test]
fn test_overlapping_paths_are_processed_once() {
    let temp = common::create_temp_project();
    let project = Project::open(temp.path(), None).unwrap();
    let file = temp.path().join("src/lib.rs");

    let options = ProcessOptions {
        paths: vec![
            file.clone(),
            temp.path().join("src"),
            temp.path().to_path_buf(),
            file.clone(),
        ],
        check: false,
    };
    let outcome = commands::process(&project, &options).unwrap();
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.updated(), 2);

    let options = ProcessOptions {
        paths: vec![file.clone(), temp.path().join("src/../src/lib.rs")],
        check: true,
    };
    let outcome = commands::process(&project, &options).unwrap();
    assert_eq!(outcome.reports.len(), 1);
}

#[test]
fn test_tag_errors_fail_the_run() {
    let temp = common::create_temp_project();
    std::fs::write(
        temp.path().join("src/bad.rs"),
        "// <spec fn=\"get_balance\" fork=\"electra\" style=\"fancy\"></spec>\n",
    )
    .unwrap();
    let project = Project::open(temp.path(), None).unwrap();

    let outcome = commands::process(&project, &ProcessOptions::default()).unwrap();
    assert_eq!(outcome.errors(), 1);
    assert!(!outcome.is_passing());

    let json = render_process(&outcome, OutputFormat::Json).unwrap();
    assert!(json.contains("unknown style `fancy`"), "{json}");
}

#[test]
fn test_config_defaults_apply() {
    let temp = common::create_temp_project();
    common::write_knowledge_base(temp.path(), "v1.5.0");
    std::fs::write(
        temp.path().join(".spectag.yml"),
        "version: v1.5.0\nversions:\n  - v1.5.0\nstyle: hash\n",
    )
    .unwrap();
    std::fs::write(
        temp.path().join("src/lib.rs"),
        "// <spec fn=\"get_balance\" fork=\"deneb\"></spec>\n",
    )
    .unwrap();

    let project = Project::open(temp.path(), None).unwrap();
    commands::process(&project, &ProcessOptions::default()).unwrap();

    let written = std::fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    assert!(written.starts_with("// <spec fn=\"get_balance\" fork=\"deneb\" hash=\""));
    assert!(written.ends_with("\" />\n"));
}

#[test]
fn test_missing_knowledge_base_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let project = Project::open(temp.path(), None).unwrap();
    assert!(commands::process(&project, &ProcessOptions::default()).is_err());
}

#[test]
fn test_history() {
    let temp = common::create_temp_project();
    let project = Project::open(temp.path(), None).unwrap();

    let listing = commands::history(&project, None, None).unwrap();
    assert_eq!(
        listing.history[&ItemKind::SszObject]["Withdrawal"],
        vec!["capella", "electra"]
    );
    assert_eq!(listing.history[&ItemKind::Function]["get_balance"], vec!["deneb"]);

    assert_eq!(listing.history[&ItemKind::Constant]["GENESIS_SLOT"], vec!["deneb"]);
    assert_eq!(listing.history[&ItemKind::CustomType]["Gwei"], vec!["deneb"]);

    let listing = commands::history(&project, None, Some("withdraw")).unwrap();
    assert!(!listing.history.contains_key(&ItemKind::Function));
    assert!(listing.history[&ItemKind::SszObject].contains_key("Withdrawal"));

    let text = render_history(&listing, OutputFormat::Text).unwrap();
    assert!(text.contains("<spec ssz_object=\"Withdrawal\" fork=\"electra\" />"));

    assert!(commands::history(&project, Some("gnosis"), None).is_err());
}
