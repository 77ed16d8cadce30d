use std::{cell::RefCell, rc::Rc};

use super::*;

fn recording_panel() -> (
    ProposalOptionsPanel<impl FnMut(&ProposalOptions)>,
    Rc<RefCell<Vec<ProposalOptions>>>,
) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let panel = ProposalOptionsPanel::new(move |options: &ProposalOptions| {
        sink.borrow_mut().push(options.clone())
    });
    (panel, seen)
}

#[test]
fn construction_emits_the_defaults() {
    let (panel, seen) = recording_panel();

    assert_eq!(*seen.borrow(), vec![ProposalOptions::default()]);
    assert!(panel.options().execute);
    assert!(panel.options().time_start.is_empty());
    assert!(!panel.is_expanded());
}

#[test]
fn every_field_change_emits_the_full_options() {
    let (mut panel, seen) = recording_panel();

    panel.set_time_start("1700000000");
    panel.set_duration_seconds("86400");
    panel.set_execute(false);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(
        seen[3],
        ProposalOptions {
            time_start: "1700000000".into(),
            duration_seconds: "86400".into(),
            execute: false,
        }
    );
    assert_eq!(seen[1].duration_seconds, "");
}

#[test]
fn unchanged_values_and_toggling_emit_nothing() {
    let (mut panel, seen) = recording_panel();

    panel.set_execute(true);
    panel.set_time_start("");
    assert!(panel.toggle());
    assert!(!panel.toggle());

    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn values_below_declared_minimums_pass_through() {
    let (mut panel, seen) = recording_panel();

    panel.set_duration_seconds("60");

    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(panel.options().duration_secs(), Some(60));
    assert!(panel.options().duration_secs() < Some(DURATION_MIN));
    assert!(!panel.options().meets_declared_minimums());
}
