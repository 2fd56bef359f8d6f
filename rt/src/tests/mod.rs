//! End-to-end tests driving the control engine the way compiled
//! programs do: thunks built from `suspend`, `push`ed frames, and
//! handler bodies resuming captured continuations.


use std::rc::Rc;

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::observer::TracingObserver;
use crate::*;

/// Unwrap a control value that is expected to have run to completion.
fn done(control: Control) -> Value {
    match control {
        Control::Done(value) => value,
        Control::Suspended(s) => panic!("computation suspended to {}", s.prompt()),
        Control::Step(_) => panic!("computation stopped at a trampoline step"),
    }
}

fn add_one(_rt: &mut Runtime<'_>, value: Value) -> Control {
    Control::Done(Value::Integer(1 + value.as_int().unwrap()))
}

fn times_ten(_rt: &mut Runtime<'_>, value: Value) -> Control {
    Control::Done(Value::Integer(10 * value.as_int().unwrap()))
}

fn countdown(_rt: &mut Runtime<'_>, value: Value) -> Control {
    match value.as_int().unwrap() {
        0 => Control::Done(Value::Integer(0)),
        n => Control::step(frame(countdown), Value::Integer(n - 1)),
    }
}

#[test]
fn handle_returns_direct_results() {
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        rt.handle(p, |_rt| Control::Done(Value::Integer(21)))
    });
    assert_eq!(result.unwrap(), Value::Integer(21));
}

#[test]
fn identity_resume_applies_the_captured_frame() {
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        rt.handle(p, move |rt| {
            suspend(p, |rt, k| {
                assert!(!k.is_empty());
                k.resume(rt, Value::Integer(2))
            })
            .then(rt, frame(add_one))
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(3));
}

#[rstest]
#[case::integer(Value::Integer(99))]
#[case::string(Value::String("aborted".into()))]
fn aborting_discards_the_continuation(#[case] payload: Value) {
    let expected = payload.clone();
    let result = run(move |rt| {
        let p = rt.fresh_prompt();
        rt.handle(p, move |rt| {
            suspend(p, move |_rt, _k| Control::Done(payload.clone())).then(rt, frame(add_one))
        })
    });
    assert_eq!(result.unwrap(), expected);
}

#[test]
fn push_extends_an_in_flight_suspension() {
    // The expanded form of what `then` emits around a suspension
    // point: match on the control value and attach the enclosing
    // context to the suspension by hand.
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        rt.handle(p, move |rt| {
            match suspend(p, |rt, k| k.resume(rt, Value::Integer(2))) {
                Control::Suspended(s) => Control::Suspended(push(s, frame(add_one))),
                other => other.then(rt, frame(add_one)),
            }
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(3));
}

#[test]
fn multi_shot_resumption_replays_the_frames() {
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        rt.handle(p, move |rt| {
            suspend(p, |rt, k| {
                let first = done(k.resume(rt, Value::Integer(1))).as_int().unwrap();
                let second = done(k.resume(rt, Value::Integer(2))).as_int().unwrap();
                Control::Done(Value::Integer(first + second))
            })
            .then(rt, frame(times_ten))
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(30));
}

#[test]
fn backtracking_explores_both_branches() {
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        rt.handle(p, move |rt| {
            suspend(p, |rt, k| {
                let yes = done(k.resume(rt, Value::Bool(true))).as_int().unwrap();
                let no = done(k.resume(rt, Value::Bool(false))).as_int().unwrap();
                Control::Done(Value::Integer(yes + no))
            })
            .then(
                rt,
                frame(|_rt, v| {
                    Control::Done(Value::Integer(if v.as_bool().unwrap() { 10 } else { 1 }))
                }),
            )
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(11));
}

#[test]
fn outer_handlers_see_through_inner_ones() {
    let result = run(|rt| {
        let outer = rt.fresh_prompt();
        let inner = rt.fresh_prompt();
        rt.handle(outer, move |rt| {
            rt.handle(inner, move |rt| {
                suspend(outer, |rt, k| {
                    // Both boundaries contributed segments, but neither
                    // holds any pending frames.
                    assert!(k.is_empty());
                    k.resume(rt, Value::Integer(7))
                })
            })
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(7));
}

#[test]
fn resuming_reenters_the_inner_handler_scope() {
    // Suspending to the outer prompt and resuming must land the
    // computation back inside the inner handler, so that a later
    // suspend to the inner prompt finds its handler again.
    let result = run(|rt| {
        let outer = rt.fresh_prompt();
        let inner = rt.fresh_prompt();
        rt.handle(outer, move |rt| {
            rt.handle(inner, move |rt| {
                suspend(outer, |rt, k| k.resume(rt, Value::Integer(7)))
                    .then(
                        rt,
                        frame(move |_rt, v| {
                            let n = v.as_int().unwrap();
                            suspend(inner, move |rt, k| k.resume(rt, Value::Integer(n + 100)))
                        }),
                    )
            })
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(107));
}

#[test]
fn continuations_restore_region_state_from_capture_time() {
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        rt.fresh_region();
        let c = rt.fresh(Value::Integer(0));

        let read = {
            let c = Rc::clone(&c);
            frame(move |_rt, _v| Control::Done(c.get()))
        };

        let out = rt.handle(p, {
            let c = Rc::clone(&c);
            move |rt| {
                suspend(p, move |rt, k| {
                    c.set(Value::Integer(5));
                    k.resume(rt, Value::Unit)
                })
                .then(rt, read)
            }
        });
        rt.leave_region();
        out
    });
    assert_eq!(result.unwrap(), Value::Integer(0));
}

#[test]
fn each_resumption_sees_capture_time_region_state() {
    let pair = constructor("Pair", 0);
    let result = run(move |rt| {
        let p = rt.fresh_prompt();
        rt.fresh_region();
        let c = rt.fresh(Value::Integer(0));

        let read = {
            let c = Rc::clone(&c);
            frame(move |_rt, _v| Control::Done(c.get()))
        };

        let out = rt.handle(p, {
            let c = Rc::clone(&c);
            move |rt| {
                suspend(p, move |rt, k| {
                    let first = done(k.resume(rt, Value::Unit));
                    c.set(Value::Integer(5));
                    let second = done(k.resume(rt, Value::Unit));
                    Control::Done(pair(vec![first, second]))
                })
                .then(rt, read)
            }
        });
        rt.leave_region();
        out
    });

    let data = result.unwrap().to_data().unwrap();
    assert_eq!(data.fields.len(), 2);
    assert_eq!(data.fields[0], Value::Integer(0));
    assert_eq!(data.fields[1], Value::Integer(0));
}

#[test]
fn global_cells_are_not_captured() {
    // Top-level cells live in the global arena, which no continuation
    // snapshots; mutations to them stay visible after a resume.
    let result = run(|rt| {
        let p = rt.fresh_prompt();
        let c = rt.fresh(Value::Integer(0));
        assert!(rt.global().is_empty());

        let read = {
            let c = Rc::clone(&c);
            frame(move |_rt, _v| Control::Done(c.get()))
        };

        rt.handle(p, {
            let c = Rc::clone(&c);
            move |rt| {
                suspend(p, move |rt, k| {
                    c.set(Value::Integer(5));
                    k.resume(rt, Value::Unit)
                })
                .then(rt, read)
            }
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(5));
}

#[test]
fn repeated_suspension_accumulates_through_a_global_cell() {
    fn emit(p: PromptId, acc: Rc<Cell>, n: i64) -> Control {
        suspend(p, move |rt, k| {
            let total = acc.get().as_int().unwrap() + n;
            acc.set(Value::Integer(total));
            k.resume(rt, Value::Unit)
        })
    }

    let result = run(|rt| {
        let p = rt.fresh_prompt();
        let acc = rt.fresh(Value::Integer(0));
        rt.handle(p, {
            let acc = Rc::clone(&acc);
            move |rt| {
                emit(p, Rc::clone(&acc), 1)
                    .then(rt, {
                        let acc = Rc::clone(&acc);
                        frame(move |_rt, _v| emit(p, Rc::clone(&acc), 2))
                    })
                    .then(rt, {
                        let acc = Rc::clone(&acc);
                        frame(move |_rt, _v| Control::Done(acc.get()))
                    })
            }
        })
    });
    assert_eq!(result.unwrap(), Value::Integer(3));
}

#[test]
fn the_trampoline_runs_in_constant_stack_space() {
    let result = run(|rt| {
        rt.trampoline(Control::step(frame(countdown), Value::Integer(1_000_000)))
    });
    assert_eq!(result.unwrap(), Value::Integer(0));
}

#[test]
fn then_composes_over_trampoline_steps() {
    let result = run(|rt| {
        Control::step(frame(countdown), Value::Integer(10)).then(rt, frame(add_one))
    });
    assert_eq!(result.unwrap(), Value::Integer(1));
}

#[test]
fn escaping_suspensions_report_the_prompt() {
    let err = run(|rt| {
        let handled = rt.fresh_prompt();
        let escaping = rt.fresh_prompt();
        rt.handle(handled, move |_rt| {
            suspend(escaping, |rt, k| k.resume(rt, Value::Unit))
        })
    })
    .unwrap_err();

    match &err.kind {
        ErrorKind::UnhandledPrompt(prompt) => {
            assert_eq!(err.to_string(), format!("unhandled prompt: {}", prompt));
        }
        other => panic!("expected an unhandled prompt, got {:?}", other),
    }
}

#[test]
#[should_panic(expected = "implementation missing")]
fn holes_terminate_the_program() {
    hole();
}

#[test]
fn tracing_observer_reports_control_transfer() {
    let mut sink = Vec::new();
    {
        let mut observer = TracingObserver::new(&mut sink);
        let result = run_with_observer(&mut observer, |rt| {
            let p = rt.fresh_prompt();
            rt.handle(p, move |rt| {
                suspend(p, |rt, k| k.resume(rt, Value::Integer(2))).then(rt, frame(add_one))
            })
        });
        assert_eq!(result.unwrap(), Value::Integer(3));
    }

    let trace = String::from_utf8(sink).unwrap();
    assert!(trace.contains("fresh-prompt"));
    assert!(trace.contains("handle"));
    assert!(trace.contains("capture"));
    assert!(trace.contains("rewind"));
}
