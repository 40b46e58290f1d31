//! Tests for operator confirmation.

use std::io::{self, Cursor};

use kubeprune::config::DryRunStrategy;
use kubeprune::prune::confirm::{parse_answer, Confirmation, Prompter, TerminalPrompter};
use kubeprune::prune::{PruneError, Target};

use crate::support::ScriptedPrompter;

fn target() -> Target {
    Target {
        namespace: "ns1".to_owned(),
        kind: "ConfigMap".to_owned(),
        name: "cm-orphan".to_owned(),
    }
}

fn scripted(answers: &[bool]) -> Box<dyn Prompter> {
    Box::new(ScriptedPrompter::new(answers))
}

#[test]
fn answers_are_case_insensitive() {
    assert_eq!(parse_answer("y\n"), Some(true));
    assert_eq!(parse_answer("YES"), Some(true));
    assert_eq!(parse_answer("No\n"), Some(false));
    assert_eq!(parse_answer("\n"), Some(false));
    assert_eq!(parse_answer("maybe"), None);
}

#[test]
fn terminal_prompter_repeats_on_invalid_input() {
    let mut output = Vec::new();
    let answer = TerminalPrompter::new(Cursor::new("what\ny\n"), &mut output)
        .ask("Delete ns1 ConfigMap/x?")
        .expect("answer");

    assert!(answer);
    let text = String::from_utf8(output).expect("utf8");
    assert_eq!(text.matches("Delete ns1 ConfigMap/x? (y/N) ").count(), 2);
    assert!(text.contains("\"what\" is not a valid answer"));
}

#[test]
fn terminal_prompter_fails_on_closed_input() {
    let err = TerminalPrompter::new(Cursor::new(""), Vec::new())
        .ask("Delete?")
        .expect_err("eof");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn dry_run_never_prompts() {
    for mode in [DryRunStrategy::Client, DryRunStrategy::Server] {
        for yes in [false, true] {
            let confirmation =
                Confirmation::for_run(yes, mode, || panic!("prompter should not be built"));
            assert!(matches!(confirmation, Confirmation::NeverPrompt));
        }
    }
}

#[test]
fn yes_skips_the_prompt() {
    let mut confirmation = Confirmation::for_run(true, DryRunStrategy::None, || {
        panic!("prompter should not be built")
    });
    assert!(!confirmation.is_interactive());
    assert!(confirmation.confirm(&target()).expect("confirm"));
}

#[test]
fn interactive_asks_about_the_target() {
    let prompter = ScriptedPrompter::new(&[false]);
    let questions = prompter.questions.clone();
    let mut confirmation = Confirmation::for_run(false, DryRunStrategy::None, || {
        Box::new(prompter) as Box<dyn Prompter>
    });

    assert!(confirmation.is_interactive());
    assert!(!confirmation.confirm(&target()).expect("confirm"));
    assert_eq!(
        *questions.lock().expect("lock poisoned"),
        vec!["Delete ns1 ConfigMap/cm-orphan?".to_owned()]
    );
}

#[test]
fn prompt_failure_is_reported() {
    let mut confirmation = Confirmation::Interactive(scripted(&[]));
    let err = confirmation.confirm(&target()).expect_err("no answer");
    assert!(matches!(err, PruneError::Prompt(_)));
}
