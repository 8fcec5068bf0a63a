//! Integration Tests for Reactive System
//!
//! These tests verify that reactive objects, effects, computed cells and refs
//! work together correctly.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde_json::json;
use weft_core::{
    computed, effect, effect_with, reactive, ref_cell, untrack, EffectOptions, Error, Key,
    Reactive, Runtime, RuntimeConfig, Target, Value,
};

fn number(value: Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

/// A first read creates exactly one edge for the active subscriber.
#[test]
fn read_creates_one_dependency_edge() {
    let state = Reactive::from_json(json!({"a": 1})).unwrap();
    let seen = Rc::new(Cell::new(0.0));

    let (view, seen_clone) = (state.clone(), seen.clone());
    let effect = effect(move || {
        seen_clone.set(number(view.get("a").unwrap()));
        // A repeated read of the same key adds nothing.
        view.get("a").unwrap();
    });

    assert_eq!(seen.get(), 1.0);
    assert_eq!(state.subscriber_count("a").unwrap(), 1);
    assert_eq!(effect.dependency_count(), 1);
}

/// Wrapping twice does not layer interception: one change, one run.
#[test]
fn double_wrapping_notifies_once() {
    let raw = Target::from_fields([("count", 0)]);
    let first = reactive(&raw);
    let second = reactive(first.raw());
    let runs = Rc::new(Cell::new(0));

    let (view, runs_clone) = (second.clone(), runs.clone());
    let _effect = effect(move || {
        view.get("count").unwrap();
        runs_clone.set(runs_clone.get() + 1);
    });

    first.set("count", 1).unwrap();
    second.set("count", 2).unwrap();

    assert_eq!(runs.get(), 3);
    assert_eq!(first.subscriber_count("count").unwrap(), 1);
}

/// Changing both inputs of a computed cell recomputes it once.
#[test]
fn computed_coalesces_changes() {
    let state = Reactive::from_json(json!({"price": 10, "quantity": 5})).unwrap();
    let calls = Rc::new(Cell::new(0));

    let (view, calls_clone) = (state.clone(), calls.clone());
    let total = computed(move || {
        calls_clone.set(calls_clone.get() + 1);
        number(view.get("price").unwrap()) * number(view.get("quantity").unwrap())
    });

    assert_eq!(total.get(), 50.0);
    assert_eq!(calls.get(), 1);

    state.set("price", 20).unwrap();
    state.set("quantity", 2).unwrap();
    assert_eq!(calls.get(), 1);

    assert_eq!(total.get(), 40.0);
    assert_eq!(calls.get(), 2);
}

/// An effect writing what it reads does not re-enter itself.
#[test]
fn effect_does_not_trigger_itself() {
    let state = Reactive::from_json(json!({"count": 0})).unwrap();
    let runs = Rc::new(Cell::new(0));

    let (view, runs_clone) = (state.clone(), runs.clone());
    let _effect = effect(move || {
        runs_clone.set(runs_clone.get() + 1);
        let count = number(view.get("count").unwrap());
        view.set("count", count + 1.0).unwrap();
    });

    assert_eq!(runs.get(), 1);
    assert_eq!(number(state.get("count").unwrap()), 1.0);

    state.set("count", 10).unwrap();
    assert_eq!(runs.get(), 2);
    assert_eq!(number(state.get("count").unwrap()), 11.0);
}

/// `a + b` re-runs on change and not on an equal write.
#[test]
fn equality_gate_on_wrapped_writes() {
    let state = Reactive::from_json(json!({"a": 1, "b": 2})).unwrap();
    let result = Rc::new(Cell::new(0.0));
    let runs = Rc::new(Cell::new(0));

    let (view, result_clone, runs_clone) = (state.clone(), result.clone(), runs.clone());
    let _effect = effect(move || {
        runs_clone.set(runs_clone.get() + 1);
        result_clone.set(number(view.get("a").unwrap()) + number(view.get("b").unwrap()));
    });
    assert_eq!(result.get(), 3.0);

    state.set("a", 5).unwrap();
    assert_eq!(result.get(), 7.0);
    assert_eq!(runs.get(), 2);

    state.set("a", 5).unwrap();
    assert_eq!(runs.get(), 2);
}

/// Ref writes are never gated, so an equal write still dirties a cell.
#[test]
fn ref_writes_are_unconditional() {
    let r1 = ref_cell(2);
    let r2 = ref_cell(3);
    let calls = Rc::new(Cell::new(0));

    let (a, b, calls_clone) = (r1.clone(), r2.clone(), calls.clone());
    let product = computed(move || {
        calls_clone.set(calls_clone.get() + 1);
        a.get() * b.get()
    });

    assert_eq!(product.get(), 6);
    assert!(!product.is_dirty());

    r1.set(2);
    assert!(product.is_dirty());
    assert_eq!(product.get(), 6);
    assert_eq!(calls.get(), 2);
}

/// Index writes reach subscribers that only read the length.
#[test]
fn index_writes_trigger_length() {
    let list = Reactive::from_json(json!(["a", "b"])).unwrap();
    let lengths = Rc::new(RefCell::new(Vec::new()));

    let (view, lengths_clone) = (list.clone(), lengths.clone());
    let _effect = effect(move || lengths_clone.borrow_mut().push(view.len()));

    list.set(0usize, "z").unwrap();
    list.set(2usize, "c").unwrap();
    list.set("length", 1).unwrap();

    assert_eq!(*lengths.borrow(), vec![2, 2, 3, 1]);
}

#[test]
fn deep_reactivity_through_nested_objects() {
    let state = Reactive::from_json(json!({
        "user": {"name": "Ada", "address": {"city": "London"}},
        "hobbies": ["reading"]
    }))
    .unwrap();
    let city = Rc::new(RefCell::new(String::new()));

    let (view, city_clone) = (state.clone(), city.clone());
    let _effect = effect(move || {
        let address = view.object("user").unwrap().object("address").unwrap();
        let name = address.get("city").unwrap();
        *city_clone.borrow_mut() = name.as_str().unwrap_or_default().to_owned();
    });
    assert_eq!(*city.borrow(), "London");

    // A view obtained separately shares the same dependency map.
    let address = state.object("user").unwrap().object("address").unwrap();
    address.set("city", "Paris").unwrap();
    assert_eq!(*city.borrow(), "Paris");

    // Replacing an intermediate object re-runs the effect too.
    let user = state.object("user").unwrap();
    user.set("address", Value::from(json!({"city": "Rome"}))).unwrap();
    assert_eq!(*city.borrow(), "Rome");
}

#[test]
fn conditional_reads_resubscribe() {
    let state = Reactive::from_json(json!({"flag": true, "a": 1, "b": 2})).unwrap();
    let runs = Rc::new(Cell::new(0));

    let (view, runs_clone) = (state.clone(), runs.clone());
    let effect = effect(move || {
        runs_clone.set(runs_clone.get() + 1);
        if view.get("flag").unwrap().as_bool().unwrap_or(false) {
            view.get("a").unwrap();
        } else {
            view.get("b").unwrap();
        }
    });
    assert_eq!(effect.dependency_count(), 2);

    state.set("flag", false).unwrap();
    assert_eq!(runs.get(), 2);

    // "a" is no longer read, so it no longer triggers.
    state.set("a", 100).unwrap();
    assert_eq!(runs.get(), 2);
    assert_eq!(state.subscriber_count("a").unwrap(), 0);

    state.set("b", 100).unwrap();
    assert_eq!(runs.get(), 3);
}

#[test]
fn computed_chain_propagates_to_effects() {
    let state = Reactive::from_json(json!({"price": 10, "quantity": 5})).unwrap();

    let view = state.clone();
    let total = computed(move || {
        number(view.get("price").unwrap()) * number(view.get("quantity").unwrap())
    });
    let total_clone = total.clone();
    let discount = computed(move || total_clone.get() * 0.5);

    let shown = Rc::new(Cell::new(0.0));
    let (discount_clone, shown_clone) = (discount.clone(), shown.clone());
    let _display = effect(move || shown_clone.set(discount_clone.get()));
    assert_eq!(shown.get(), 25.0);

    state.set("quantity", 10).unwrap();
    assert_eq!(shown.get(), 50.0);
    assert_eq!(total.compute_count(), 2);
    assert_eq!(discount.compute_count(), 2);
}

#[test]
fn nested_effect_restores_outer_context() {
    let outer_source = ref_cell(0);
    let inner_source = ref_cell(0);
    let outer_runs = Rc::new(Cell::new(0));

    let (outer_clone, inner_clone) = (outer_source.clone(), inner_source.clone());
    let outer_runs_clone = outer_runs.clone();
    let inner_effect = Rc::new(RefCell::new(None));
    let inner_effect_clone = inner_effect.clone();
    let _outer = effect(move || {
        outer_runs_clone.set(outer_runs_clone.get() + 1);
        let inner_read = inner_clone.clone();
        *inner_effect_clone.borrow_mut() = Some(effect(move || {
            inner_read.get();
        }));
        // Read after the inner effect finished: tracked by the outer one.
        outer_clone.get();
    });

    assert_eq!(outer_source.subscriber_count(), 1);
    assert!(Runtime::current_subscriber().is_none());

    outer_source.set(1);
    assert_eq!(outer_runs.get(), 2);

    // Only the inner effect read this one.
    inner_source.set(1);
    assert_eq!(outer_runs.get(), 2);
}

#[test]
fn panicking_body_restores_context_and_propagates() {
    let source = ref_cell(false);
    let source_clone = source.clone();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        effect(move || {
            if !source_clone.get() {
                panic!("first run fails");
            }
        })
    }));

    assert!(result.is_err());
    assert!(!Runtime::is_tracking());
}

#[test]
fn failing_subscriber_does_not_stop_the_others() {
    let source = ref_cell(0);
    let healthy_runs = Rc::new(Cell::new(0));

    let failing_source = source.clone();
    let _failing = effect(move || {
        if failing_source.get() > 0 {
            panic!("subscriber failed");
        }
    });
    let (healthy_source, runs_clone) = (source.clone(), healthy_runs.clone());
    let _healthy = effect(move || {
        healthy_source.get();
        runs_clone.set(runs_clone.get() + 1);
    });

    let result = panic::catch_unwind(AssertUnwindSafe(|| source.set(1)));

    assert!(result.is_err());
    assert_eq!(healthy_runs.get(), 2);
    assert!(!Runtime::is_tracking());
}

#[test]
fn dispatch_uses_a_snapshot() {
    let source = ref_cell(0);
    let late_runs = Rc::new(Cell::new(0));
    let late = Rc::new(RefCell::new(None));

    let (source_clone, late_clone, late_runs_clone) =
        (source.clone(), late.clone(), late_runs.clone());
    let _joiner = effect(move || {
        if source_clone.get() == 1 && late_clone.borrow().is_none() {
            // Subscribes during dispatch; must not run again in this pass.
            let (inner_source, runs) = (source_clone.clone(), late_runs_clone.clone());
            *late_clone.borrow_mut() = Some(effect(move || {
                inner_source.get();
                runs.set(runs.get() + 1);
            }));
        }
    });

    source.set(1);
    assert_eq!(late_runs.get(), 1);

    source.set(2);
    assert_eq!(late_runs.get(), 2);
}

#[test]
fn scheduler_overrides_rerun() {
    let state = Reactive::from_json(json!({"n": 0})).unwrap();
    let queue = Rc::new(RefCell::new(Vec::new()));
    let runs = Rc::new(Cell::new(0));

    let (view, runs_clone, queue_clone) = (state.clone(), runs.clone(), queue.clone());
    let effect = effect_with(
        move || {
            view.get("n").unwrap();
            runs_clone.set(runs_clone.get() + 1);
        },
        EffectOptions::new().scheduler(move |effect| queue_clone.borrow_mut().push(effect.clone())),
    );

    state.set("n", 1).unwrap();
    state.set("n", 2).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(queue.borrow().len(), 2);

    // Flush one queued job by hand.
    let job = queue.borrow_mut().pop();
    if let Some(job) = job {
        assert_eq!(job, effect);
        job.run();
    }
    assert_eq!(runs.get(), 2);
}

#[test]
fn untracked_reads_create_no_edges() {
    let state = Reactive::from_json(json!({"a": 1, "b": 2})).unwrap();

    let view = state.clone();
    let effect = effect(move || {
        view.get("a").unwrap();
        untrack(|| view.get("b").unwrap());
    });

    assert_eq!(effect.dependency_count(), 1);
    assert_eq!(state.subscriber_count("b").unwrap(), 0);
}

#[test]
fn indirect_cycles_are_stopped() {
    Runtime::configure(RuntimeConfig::default().with_max_reentry(2));
    let a = ref_cell(0);
    let b = ref_cell(0);

    // The second effect closes the cycle while it is being created.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let (a_read, b_write) = (a.clone(), b.clone());
        let _forward = effect(move || b_write.set(a_read.get() + 1));
        let (b_read, a_write) = (b.clone(), a.clone());
        let _backward = effect(move || a_write.set(b_read.get() + 1));
    }));
    let payload = result.expect_err("cycle should be stopped");

    assert!(matches!(
        payload.downcast_ref::<Error>(),
        Some(Error::CycleDetected { limit: 2, .. })
    ));
    assert!(!Runtime::is_tracking());
    Runtime::configure(RuntimeConfig::default());
}

/// Long acyclic chains nest one dispatch per link and must still settle.
#[test]
fn deep_acyclic_chains_propagate() {
    const LINKS: usize = 300;

    let worker = std::thread::Builder::new()
        .stack_size(32 << 20)
        .spawn(|| {
            let source = ref_cell(0usize);
            let head = {
                let source = source.clone();
                computed(move || source.get())
            };

            let mut tail = head.clone();
            let mut chain = vec![head];
            for _ in 1..LINKS {
                let prev = tail.clone();
                tail = computed(move || prev.get() + 1);
                chain.push(tail.clone());
            }

            let seen = Rc::new(Cell::new(0));
            let (last, seen_clone) = (tail.clone(), seen.clone());
            let _effect = effect(move || seen_clone.set(last.get()));
            assert_eq!(seen.get(), LINKS - 1);

            source.set(1);

            assert_eq!(seen.get(), LINKS);
            assert_eq!(tail.get(), LINKS);
            assert!(chain.iter().all(|cell| !cell.is_dirty()));
        })
        .unwrap();

    worker.join().unwrap();
}

#[test]
fn dropping_targets_clears_the_registry() {
    let before = Runtime::tracked_target_count();
    {
        let state = Reactive::from_json(json!({"a": {"b": 1}})).unwrap();
        let view = state.clone();
        let effect = effect(move || {
            view.object("a").unwrap().get("b").unwrap();
        });
        assert_eq!(Runtime::tracked_target_count(), before + 2);

        effect.dispose();
        assert_eq!(state.subscriber_count("a").unwrap(), 0);
    }
    assert_eq!(Runtime::tracked_target_count(), before);
}

/// A live effect is held by the dependency sets it joined, so the targets its
/// body captured stay registered until the effect is disposed.
#[test]
fn undisposed_effects_keep_captured_targets() {
    fn watch_field() -> weft_core::Effect {
        let state = Reactive::from_json(json!({"a": 1})).unwrap();
        effect(move || {
            state.get("a").unwrap();
        })
    }

    let before = Runtime::tracked_target_count();

    // The handle is dropped, but the dependency set still holds the effect.
    drop(watch_field());
    assert_eq!(Runtime::tracked_target_count(), before + 1);

    let watcher = watch_field();
    assert_eq!(Runtime::tracked_target_count(), before + 2);

    watcher.dispose();
    drop(watcher);
    assert_eq!(Runtime::tracked_target_count(), before + 1);
}

#[test]
fn removed_index_keeps_length() {
    let list = Reactive::from_json(json!([1, 2, 3])).unwrap();
    let reads = Rc::new(Cell::new(0));

    let (view, reads_clone) = (list.clone(), reads.clone());
    let _effect = effect(move || {
        view.get(1usize).unwrap();
        reads_clone.set(reads_clone.get() + 1);
    });

    assert!(list.remove(1usize).unwrap());
    assert_eq!(reads.get(), 2);
    assert_eq!(list.len(), 3);
    assert_eq!(list.snapshot().unwrap(), json!([1, null, 3]));
    assert_eq!(list.subscriber_count(Key::Index(1)).unwrap(), 1);
}
