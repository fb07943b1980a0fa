use super::*;
use shared::{
    domain::{LevelRange, SubjectCode, Term, RATING_SCALE_MAX},
    protocol::{CriterionInput, RawValue},
};
use std::{cell::RefCell, rc::Rc};

fn recorder(engine: &FilterEngine) -> (ObserverId, Rc<RefCell<Vec<FilterNotification>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let id = engine.subscribe(move |notification| sink.borrow_mut().push(notification.clone()));
    (id, seen)
}

fn subject(code: &str) -> FilterCriterion {
    FilterCriterion::subject(code).expect("subject")
}

fn rating(value: f64) -> FilterCriterion {
    FilterCriterion::rating_min(value).expect("rating")
}

#[test]
fn badge_scenario_walks_through_set_toggle_and_clear() {
    let mut engine = FilterEngine::new();

    assert!(engine.set_criterion(subject("COMP")).expect("set subject"));
    assert_eq!(engine.active_count(), 1);

    assert!(engine.set_criterion(rating(4.5)).expect("set rating"));
    assert_eq!(engine.active_count(), 2);

    assert!(engine.toggle_criterion(subject("COMP")).expect("toggle subject"));
    assert_eq!(engine.active_count(), 1);
    assert!(engine.state().get(FilterCategory::Subject).is_none());

    assert!(engine.clear_all());
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn invalid_criterion_leaves_state_untouched() {
    let mut engine = FilterEngine::new();
    engine.set_criterion(subject("MATH")).expect("set subject");
    let (_, seen) = recorder(&engine);
    let before = engine.build_query_descriptor();

    let err = engine
        .set_criterion(CriterionInput::new(FilterCategory::RatingMin, "not-a-number"))
        .expect_err("non-numeric rating");

    assert!(matches!(
        err,
        FilterError::InvalidCriterion {
            category: FilterCategory::RatingMin,
            ..
        }
    ));
    assert_eq!(engine.active_count(), 1);
    assert_eq!(engine.build_query_descriptor(), before);
    assert!(seen.borrow().is_empty(), "errors never reach observers");

    let err = engine
        .toggle_criterion((FilterCategory::Level, RawValue::Text("nine".into())))
        .expect_err("bad level");
    assert_eq!(err.category(), FilterCategory::Level);
    assert_eq!(engine.active_count(), 1);
}

#[test]
fn setting_equal_value_is_silent() {
    let mut engine = FilterEngine::new();
    let (_, seen) = recorder(&engine);

    assert!(engine.set_criterion(rating(4.0)).expect("first"));
    assert!(!engine.set_criterion(rating(4.0)).expect("second"));
    assert!(!engine
        .set_criterion(CriterionInput::new(FilterCategory::RatingMin, "4"))
        .expect("equal text form"));

    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn out_of_range_and_nan_thresholds_are_rejected_without_notifying() {
    let mut engine = FilterEngine::new();
    engine.set_criterion(subject("COMP")).expect("set subject");
    let (_, seen) = recorder(&engine);
    let before = engine.build_query_descriptor();

    for (category, value) in [
        (FilterCategory::RatingMin, 99.0),
        (FilterCategory::RatingMin, -0.5),
        (FilterCategory::RatingMin, f64::NAN),
        (FilterCategory::PriceMax, -1.0),
        (FilterCategory::PriceMax, f64::NAN),
        (FilterCategory::PriceMax, f64::INFINITY),
    ] {
        let err = engine
            .set_criterion((category, RawValue::Number(value)))
            .expect_err("threshold outside its scale");
        assert_eq!(err.category(), category);
        engine
            .toggle_criterion((category, RawValue::Number(value)))
            .expect_err("toggle checks the value too");
    }

    assert!(FilterCriterion::rating_min(99.0).is_err());
    assert!(FilterCriterion::level(9, 1).is_err());
    assert!(LevelRange::new(9, 1).is_none());

    assert_eq!(engine.active_count(), 1);
    assert_eq!(engine.build_query_descriptor(), before);
    assert!(seen.borrow().is_empty());
}

#[test]
fn boundary_thresholds_set_twice_notify_once() {
    let mut engine = FilterEngine::new();
    let (_, seen) = recorder(&engine);

    for value in [0.0, RATING_SCALE_MAX] {
        assert!(engine.set_criterion(rating(value)).expect("first"));
        assert!(!engine
            .set_criterion((FilterCategory::RatingMin, RawValue::Number(value)))
            .expect("second"));
    }
    let price = || FilterCriterion::price_max(0.0).expect("free");
    assert!(engine.set_criterion(price()).expect("first"));
    assert!(!engine.set_criterion(price()).expect("second"));

    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(engine.build_query_descriptor().rating_min, Some(RATING_SCALE_MAX));

    assert!(engine.toggle_criterion(rating(RATING_SCALE_MAX)).expect("toggle off"));
    assert!(engine.state().get(FilterCategory::RatingMin).is_none());
    assert_eq!(engine.active_count(), 1);
}

#[test]
fn replacing_a_criterion_reports_the_previous_value() {
    let mut engine = FilterEngine::new();
    let (_, seen) = recorder(&engine);

    engine.set_criterion(rating(3.0)).expect("first");
    engine.set_criterion(rating(4.0)).expect("replace");

    assert_eq!(engine.active_count(), 1);
    let seen = seen.borrow();
    assert_eq!(
        seen[1].change,
        FilterChange::Set {
            criterion: rating(4.0),
            replaced: Some(rating(3.0)),
        }
    );
    assert_eq!(seen[1].descriptor.rating_min, Some(4.0));
}

#[test]
fn toggle_with_different_value_replaces_instead_of_removing() {
    let mut engine = FilterEngine::new();
    engine.set_criterion(subject("COMP")).expect("set");

    assert!(engine.toggle_criterion(subject("MATH")).expect("toggle"));

    assert_eq!(engine.state().get(FilterCategory::Subject), Some(&subject("MATH")));
}

#[test]
fn clear_criterion_on_missing_category_is_a_no_op() {
    let mut engine = FilterEngine::new();
    let (_, seen) = recorder(&engine);

    assert!(!engine.clear_criterion(FilterCategory::PriceMax));
    assert!(!engine.clear_all());
    assert!(seen.borrow().is_empty());

    engine
        .set_criterion(FilterCriterion::price_max(20.0).expect("price"))
        .expect("set");
    assert!(engine.clear_criterion(FilterCategory::PriceMax));
    assert_eq!(
        seen.borrow().last().map(|n| n.change.clone()),
        Some(FilterChange::Cleared(
            FilterCriterion::price_max(20.0).expect("price")
        ))
    );
}

#[test]
fn clear_all_notifies_once_with_removed_criteria() {
    let mut engine = FilterEngine::new();
    engine.set_criterion(subject("COMP")).expect("subject");
    engine
        .set_criterion(FilterCriterion::availability(Term::T1))
        .expect("term");
    let (_, seen) = recorder(&engine);

    assert!(engine.clear_all());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].active_count, 0);
    assert!(seen[0].descriptor.is_unfiltered());
    assert_eq!(
        seen[0].change,
        FilterChange::ClearedAll(vec![
            subject("COMP"),
            FilterCriterion::availability(Term::T1)
        ])
    );
}

#[test]
fn observers_run_in_subscription_order() {
    let mut engine = FilterEngine::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let order = order.clone();
        engine.subscribe(move |_| order.borrow_mut().push(label));
    }

    engine.set_criterion(subject("COMP")).expect("set");

    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn unsubscribed_observer_stops_receiving() {
    let mut engine = FilterEngine::new();
    let (id, seen) = recorder(&engine);

    engine.set_criterion(subject("COMP")).expect("set");
    assert!(engine.unsubscribe(id));
    assert!(!engine.unsubscribe(id));
    engine.clear_all();

    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn observer_may_unsubscribe_a_later_observer_mid_notification() {
    let mut engine = FilterEngine::new();
    let registry = engine.observers();
    let victim: Rc<RefCell<Option<ObserverId>>> = Rc::new(RefCell::new(None));

    let target = victim.clone();
    engine.subscribe(move |_| {
        if let Some(id) = target.borrow_mut().take() {
            registry.unsubscribe(id);
        }
    });
    let (victim_id, victim_seen) = recorder(&engine);
    *victim.borrow_mut() = Some(victim_id);
    let (_, tail_seen) = recorder(&engine);

    engine.set_criterion(subject("COMP")).expect("set");

    assert!(victim_seen.borrow().is_empty());
    assert_eq!(tail_seen.borrow().len(), 1);
    assert_eq!(engine.observers().len(), 2);
}

#[test]
fn observer_may_unsubscribe_itself() {
    let mut engine = FilterEngine::new();
    let registry = engine.observers();
    let own_id: Rc<RefCell<Option<ObserverId>>> = Rc::new(RefCell::new(None));
    let calls = Rc::new(RefCell::new(0));

    let slot = own_id.clone();
    let counter = calls.clone();
    let id = engine.subscribe(move |_| {
        *counter.borrow_mut() += 1;
        if let Some(id) = *slot.borrow() {
            registry.unsubscribe(id);
        }
    });
    *own_id.borrow_mut() = Some(id);

    engine.set_criterion(subject("COMP")).expect("set");
    engine.set_criterion(rating(2.0)).expect("set");

    assert_eq!(*calls.borrow(), 1);
    assert!(engine.observers().is_empty());
}

#[test]
fn observer_subscribed_mid_notification_waits_for_next_change() {
    let mut engine = FilterEngine::new();
    let registry = engine.observers();
    let late_calls = Rc::new(RefCell::new(0));
    let subscribed = Rc::new(RefCell::new(false));

    let counter = late_calls.clone();
    let flag = subscribed.clone();
    engine.subscribe(move |_| {
        if !*flag.borrow() {
            *flag.borrow_mut() = true;
            let counter = counter.clone();
            registry.subscribe(move |_| *counter.borrow_mut() += 1);
        }
    });

    engine.set_criterion(subject("COMP")).expect("set");
    assert_eq!(*late_calls.borrow(), 0);

    engine.clear_all();
    assert_eq!(*late_calls.borrow(), 1);
}

#[test]
fn descriptor_reflects_every_category() {
    let mut engine = FilterEngine::new();
    engine.set_criterion(subject("comp")).expect("subject");
    engine.set_criterion(rating(4.5)).expect("rating");
    engine
        .set_criterion(FilterCriterion::price_max(0.0).expect("price"))
        .expect("price");
    engine
        .set_criterion(FilterCriterion::level(1, 2).expect("level"))
        .expect("level");
    engine
        .set_criterion(FilterCriterion::availability(Term::T3))
        .expect("term");

    assert_eq!(
        engine.build_query_descriptor(),
        QueryDescriptor {
            subject: SubjectCode::parse("COMP"),
            rating_min: Some(4.5),
            price_max: Some(0.0),
            level: LevelRange::new(1, 2),
            availability: Some(Term::T3),
        }
    );
    assert_eq!(engine.active_count(), FilterCategory::ALL.len());
}

#[test]
fn notification_carries_fresh_descriptor_and_count() {
    let mut engine = FilterEngine::new();
    let (_, seen) = recorder(&engine);

    engine.set_criterion(subject("COMP")).expect("subject");
    engine.set_criterion(rating(4.5)).expect("rating");

    let seen = seen.borrow();
    assert_eq!(seen[0].active_count, 1);
    assert_eq!(seen[0].descriptor.rating_min, None);
    assert_eq!(seen[1].active_count, 2);
    assert_eq!(seen[1].descriptor, engine.build_query_descriptor());
}

#[test]
fn filter_error_maps_to_validation_api_error() {
    let err = FilterError::invalid(FilterCategory::PriceMax, "-3 is not a non-negative price");
    let api: ApiError = err.into();
    assert_eq!(api.code, ErrorCode::Validation);
    assert_eq!(
        api.message,
        "invalid price_max criterion: -3 is not a non-negative price"
    );
}
