// tests/interactive_simulation.rs
// Drives the controller and the execution worker the way the playground UI does

use jac_playground::graph::GraphSnapshot;
use jac_playground::runtime::{ExecutionHooks, RuntimeError, ScriptError};
use jac_playground::{
    convert_jac_to_python, convert_python_to_jac, PlaygroundConfig, PlaygroundError, Runtime,
    ScriptRuntime, ThreadController, WorkerEvent,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn ready_controller() -> ThreadController {
    let mut controller =
        ThreadController::new(PlaygroundConfig::default(), Box::new(ScriptRuntime::default()));
    assert!(controller.initialize().expect("worker starts"), "runtime should load");
    controller
}

fn next_event(controller: &mut ThreadController) -> WorkerEvent {
    controller
        .wait_event(TIMEOUT)
        .expect("worker alive")
        .expect("worker went quiet")
}

/// Events up to and including the next `breakHit` or `execEnd`.
fn run_until_stop(controller: &mut ThreadController) -> Vec<WorkerEvent> {
    let mut events = Vec::new();
    loop {
        let event = next_event(controller);
        let stop = matches!(event, WorkerEvent::BreakHit { .. } | WorkerEvent::ExecEnd);
        events.push(event);
        if stop {
            return events;
        }
    }
}

fn expect_break(controller: &mut ThreadController) -> u32 {
    match run_until_stop(controller).pop() {
        Some(WorkerEvent::BreakHit { line }) => line,
        other => panic!("expected a breakpoint hit, got {:?}", other),
    }
}

fn stdout_of(events: &[WorkerEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Stdout { output } => Some(output.as_str()),
            _ => None,
        })
        .collect()
}

const FIVE_PRINTS: &str = "print(1)\nprint(2)\nprint(3)\nprint(4)\nprint(5)\n";

const NESTED: &str = "def greet():
    print(\"hi\")
    print(\"there\")
greet()
print(\"done\")
";

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_clean_run() {
        let mut controller = ready_controller();
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        let _ = controller.on_stdout(move |text| sink.borrow_mut().push_str(text));

        controller.start_execution("print(\"hello\")\nprint(1 + 2)\n").unwrap();
        let events = run_until_stop(&mut controller);

        assert_eq!(events.last(), Some(&WorkerEvent::ExecEnd));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Stderr { .. })));
        assert_eq!(*seen.borrow(), "hello\n3\n");

        let session = controller.session().expect("session recorded");
        assert_eq!(session.source(), "print(\"hello\")\nprint(1 + 2)\n");
        assert!(!session.is_active());
        assert_eq!(session.stdout(), "hello\n3\n");
        controller.shutdown().unwrap();
    }

    #[test]
    fn test_breakpoint_hit_then_continue() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[3]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();

        let before = run_until_stop(&mut controller);
        assert_eq!(before.last(), Some(&WorkerEvent::BreakHit { line: 3 }));
        assert_eq!(stdout_of(&before), "1\n2\n", "line 3 has not run yet");

        let session = controller.session().unwrap();
        assert!(session.is_paused());
        assert_eq!(session.highlighted_line(), Some(3));

        controller.continue_execution().unwrap();
        let after = run_until_stop(&mut controller);
        assert_eq!(after.last(), Some(&WorkerEvent::ExecEnd));
        assert_eq!(stdout_of(&after), "3\n4\n5\n");
        assert_eq!(controller.session().unwrap().highlighted_line(), None);
    }

    #[test]
    fn test_breakpoints_hit_in_order() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[5, 2]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();

        assert_eq!(expect_break(&mut controller), 2);
        controller.continue_execution().unwrap();
        assert_eq!(expect_break(&mut controller), 5);
        controller.continue_execution().unwrap();
        assert_eq!(run_until_stop(&mut controller).last(), Some(&WorkerEvent::ExecEnd));
    }

    #[test]
    fn test_runtime_error_goes_to_stderr() {
        let mut controller = ready_controller();
        controller
            .start_execution("print(\"a\")\nraise ValueError(\"boom\")\n")
            .unwrap();
        let events = run_until_stop(&mut controller);

        let stderr: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Stderr { output } => Some(output.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stderr.len(), 1, "traceback is one stderr event");
        assert!(stderr[0].contains("line 2"));
        assert!(stderr[0].ends_with("ValueError: boom\n"));
        assert_eq!(events.last(), Some(&WorkerEvent::ExecEnd));
    }

    #[test]
    fn test_terminate_a_running_loop() {
        let mut controller = ready_controller();
        controller.start_execution("while True:\n    x = 1\n").unwrap();
        thread::sleep(Duration::from_millis(20));
        controller.terminate().unwrap();

        let events = run_until_stop(&mut controller);
        assert_eq!(stdout_of(&events), "Execution stopped by user.\n");
        assert_eq!(events.last(), Some(&WorkerEvent::ExecEnd));
        assert!(!controller.is_session_active());
    }

    #[test]
    fn test_terminate_right_after_start() {
        let mut controller = ready_controller();
        controller.start_execution(FIVE_PRINTS).unwrap();
        controller.terminate().unwrap();

        let events = run_until_stop(&mut controller);
        assert_eq!(events.last(), Some(&WorkerEvent::ExecEnd));
        assert_eq!(stdout_of(&events), "Execution stopped by user.\n");
        assert!(!controller.is_session_active());
        assert_eq!(
            controller.wait_event(Duration::from_millis(200)).unwrap(),
            None,
            "nothing follows execEnd"
        );
    }

    #[test]
    fn test_terminate_while_suspended() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[2]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();
        assert_eq!(expect_break(&mut controller), 2);

        controller.terminate().unwrap();
        let events = run_until_stop(&mut controller);
        assert_eq!(stdout_of(&events), "Execution stopped by user.\n");

        // The next session starts from a clean control block.
        controller.set_breakpoints(&[]).unwrap();
        controller.start_execution("print(\"again\")\n").unwrap();
        assert_eq!(stdout_of(&run_until_stop(&mut controller)), "again\n");
    }

    #[test]
    fn test_empty_breakpoints_are_idempotent() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[]).unwrap();
        controller.set_breakpoints(&[]).unwrap();
        assert!(controller.breakpoints().is_empty());

        controller.start_execution(FIVE_PRINTS).unwrap();
        let events = run_until_stop(&mut controller);
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::BreakHit { .. })));
        assert_eq!(stdout_of(&events), "1\n2\n3\n4\n5\n");
    }

    #[test]
    fn test_breakpoints_cleared_while_suspended() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[2, 4]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();
        assert_eq!(expect_break(&mut controller), 2);

        controller.set_breakpoints(&[]).unwrap();
        controller.set_breakpoints(&[]).unwrap();
        controller.continue_execution().unwrap();
        let events = run_until_stop(&mut controller);
        assert_eq!(events.last(), Some(&WorkerEvent::ExecEnd), "line 4 no longer stops");
    }

    #[test]
    fn test_breakpoints_changed_mid_run() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[2]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();
        assert_eq!(expect_break(&mut controller), 2);

        controller.set_breakpoints(&[4]).unwrap();
        assert_eq!(controller.breakpoints(), vec![4]);
        controller.continue_execution().unwrap();

        let events = run_until_stop(&mut controller);
        assert_eq!(events.last(), Some(&WorkerEvent::BreakHit { line: 4 }));
        assert_eq!(stdout_of(&events), "2\n3\n");
        controller.continue_execution().unwrap();
        assert_eq!(run_until_stop(&mut controller).last(), Some(&WorkerEvent::ExecEnd));
    }

    #[test]
    fn test_breakpoints_set_right_after_continue() {
        let config = PlaygroundConfig {
            command_handoff_timeout_ms: 100,
            ..PlaygroundConfig::default()
        };
        for _ in 0..20 {
            let mut controller =
                ThreadController::new(config.clone(), Box::new(ScriptRuntime::default()));
            assert!(controller.initialize().unwrap());
            controller.set_breakpoints(&[1]).unwrap();
            controller.start_execution(FIVE_PRINTS).unwrap();
            assert_eq!(expect_break(&mut controller), 1);

            controller.continue_execution().unwrap();
            controller.set_breakpoints(&[]).unwrap();

            // The rebuild may already have drained the tail of the run.
            while controller.is_session_active() {
                next_event(&mut controller);
            }
            let session = controller.session().unwrap();
            assert_eq!(session.stdout(), "1\n2\n3\n4\n5\n", "continue was not lost");
            controller.shutdown().unwrap();
        }
    }

    #[test]
    fn test_graph_is_merged_into_the_session() {
        let mut controller = ready_controller();
        let graphs = Rc::new(RefCell::new(Vec::<GraphSnapshot>::new()));
        let sink = Rc::clone(&graphs);
        let _ = controller.on_graph(move |g| sink.borrow_mut().push(g.clone()));

        controller.set_breakpoints(&[4]).unwrap();
        controller
            .start_execution("node a \"Alice\"\nnode b \"Bob\"\nroot ++> a\na ++> b\nprint(\"done\")\n")
            .unwrap();
        let before = run_until_stop(&mut controller);
        assert!(
            before.iter().any(|e| matches!(e, WorkerEvent::JacGraph { .. })),
            "graph published before the break"
        );
        controller.continue_execution().unwrap();
        run_until_stop(&mut controller);

        let session = controller.session().unwrap();
        assert_eq!(session.graph().nodes.len(), 3);
        assert_eq!(session.graph().edges.len(), 2);
        assert!(!graphs.borrow().is_empty());
    }
}

#[cfg(test)]
mod stepping_tests {
    use super::*;

    #[test]
    fn test_step_into_a_call() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[4]).unwrap();
        controller.start_execution(NESTED).unwrap();
        assert_eq!(expect_break(&mut controller), 4);

        controller.step_into().unwrap();
        assert_eq!(expect_break(&mut controller), 2);
        controller.step_into().unwrap();
        assert_eq!(expect_break(&mut controller), 3);
        controller.step_into().unwrap();
        assert_eq!(expect_break(&mut controller), 5);
    }

    #[test]
    fn test_step_over_a_call() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[4]).unwrap();
        controller.start_execution(NESTED).unwrap();
        assert_eq!(expect_break(&mut controller), 4);

        controller.step_over().unwrap();
        let events = run_until_stop(&mut controller);
        assert_eq!(events.last(), Some(&WorkerEvent::BreakHit { line: 5 }));
        assert_eq!(stdout_of(&events), "hi\nthere\n");
    }

    #[test]
    fn test_step_out_of_a_call() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[2]).unwrap();
        controller.start_execution(NESTED).unwrap();
        assert_eq!(expect_break(&mut controller), 2);

        controller.step_out().unwrap();
        let events = run_until_stop(&mut controller);
        assert_eq!(events.last(), Some(&WorkerEvent::BreakHit { line: 5 }));
        assert_eq!(stdout_of(&events), "hi\nthere\n");

        controller.step_out().unwrap();
        assert_eq!(run_until_stop(&mut controller).last(), Some(&WorkerEvent::ExecEnd));
    }

    #[test]
    fn test_each_resume_is_consumed_once() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[1]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();
        assert_eq!(expect_break(&mut controller), 1);

        controller.step_over().unwrap();
        assert!(
            matches!(controller.step_over(), Err(PlaygroundError::NotSuspended)),
            "a second step before the next break is rejected"
        );
        assert_eq!(expect_break(&mut controller), 2);
    }
}

#[cfg(test)]
mod misuse_tests {
    use super::*;

    struct BrokenRuntime;

    impl Runtime for BrokenRuntime {
        fn load(&mut self) -> Result<(), RuntimeError> {
            Err(RuntimeError::Load("support files missing".to_string()))
        }

        fn execute(&mut self, _: &str, _: &mut dyn ExecutionHooks) -> Result<(), ScriptError> {
            Ok(())
        }

        fn convert(
            &mut self,
            _: jac_playground::protocol::ConversionDirection,
            source: &str,
        ) -> Result<String, RuntimeError> {
            Ok(source.to_string())
        }
    }

    struct PanickingRuntime;

    impl Runtime for PanickingRuntime {
        fn load(&mut self) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn execute(&mut self, source: &str, _: &mut dyn ExecutionHooks) -> Result<(), ScriptError> {
            if source.contains("explode") {
                panic!("interpreter state corrupted");
            }
            Ok(())
        }

        fn convert(
            &mut self,
            _: jac_playground::protocol::ConversionDirection,
            source: &str,
        ) -> Result<String, RuntimeError> {
            Ok(source.to_string())
        }
    }

    // Takes longer to load than the controller is willing to wait.
    struct SlowLoadRuntime;

    impl Runtime for SlowLoadRuntime {
        fn load(&mut self) -> Result<(), RuntimeError> {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        }

        fn execute(&mut self, _: &str, hooks: &mut dyn ExecutionHooks) -> Result<(), ScriptError> {
            hooks.stdout("loaded late\n");
            Ok(())
        }

        fn convert(
            &mut self,
            _: jac_playground::protocol::ConversionDirection,
            source: &str,
        ) -> Result<String, RuntimeError> {
            Ok(source.to_string())
        }
    }

    #[test]
    fn test_late_initialized_reply_marks_the_runtime_loaded() {
        let config = PlaygroundConfig {
            init_timeout_ms: 50,
            ..PlaygroundConfig::default()
        };
        let mut controller = ThreadController::new(config, Box::new(SlowLoadRuntime));
        let reported = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&reported);
        let _ = controller.on_initialized(move |ok| *sink.borrow_mut() = Some(ok));

        assert!(matches!(
            controller.initialize(),
            Err(PlaygroundError::InitializationTimeout { millis: 50 })
        ));
        assert!(!controller.is_loaded());

        assert_eq!(next_event(&mut controller), WorkerEvent::Initialized { success: true });
        assert!(controller.is_loaded());
        assert_eq!(*reported.borrow(), Some(true));

        controller.start_execution("anything").unwrap();
        assert_eq!(stdout_of(&run_until_stop(&mut controller)), "loaded late\n");
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let mut controller = ready_controller();
        assert!(matches!(controller.initialize(), Err(PlaygroundError::AlreadyInitialized)));
        assert!(controller.is_loaded());
    }

    #[test]
    fn test_failed_load_is_reported() {
        let mut controller = ThreadController::new(PlaygroundConfig::default(), Box::new(BrokenRuntime));
        let loaded = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&loaded);
        let _ = controller.on_initialized(move |ok| *sink.borrow_mut() = Some(ok));

        assert!(!controller.initialize().unwrap());
        assert_eq!(*loaded.borrow(), Some(false));
        assert!(matches!(
            controller.start_execution("print(1)\n"),
            Err(PlaygroundError::NotInitialized)
        ));
    }

    #[test]
    fn test_start_before_initialize_is_rejected() {
        let mut controller =
            ThreadController::new(PlaygroundConfig::default(), Box::new(ScriptRuntime::default()));
        assert!(matches!(
            controller.start_execution("print(1)\n"),
            Err(PlaygroundError::NotInitialized)
        ));
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[1]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();
        assert_eq!(expect_break(&mut controller), 1);

        assert!(matches!(
            controller.start_execution("print(2)\n"),
            Err(PlaygroundError::SessionActive)
        ));
        controller.terminate().unwrap();
        run_until_stop(&mut controller);
    }

    #[test]
    fn test_step_without_a_suspended_session_is_rejected() {
        let mut controller = ready_controller();
        assert!(matches!(controller.step_into(), Err(PlaygroundError::NotSuspended)));
        assert!(matches!(controller.continue_execution(), Err(PlaygroundError::NotSuspended)));
        assert!(matches!(controller.terminate(), Err(PlaygroundError::NoActiveSession)));
    }

    #[test]
    fn test_runtime_panic_is_reported_and_worker_survives() {
        let mut controller =
            ThreadController::new(PlaygroundConfig::default(), Box::new(PanickingRuntime));
        assert!(controller.initialize().unwrap());

        controller.start_execution("explode").unwrap();
        let events = run_until_stop(&mut controller);
        assert!(events.iter().any(|e| matches!(
            e,
            WorkerEvent::Stderr { output } if output.contains("interpreter state corrupted")
        )));

        controller.start_execution("fine").unwrap();
        assert_eq!(run_until_stop(&mut controller), vec![WorkerEvent::ExecEnd]);
    }

    #[test]
    fn test_shutdown_with_a_suspended_session() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[1]).unwrap();
        controller.start_execution("while True:\n    x = 1\n").unwrap();
        assert_eq!(expect_break(&mut controller), 1);
        controller.shutdown().expect("worker joins");
    }
}

#[cfg(test)]
mod conversion_tests {
    use super::*;

    // Sleeps through its first conversion so the caller times out.
    struct SlowRuntime {
        calls: Arc<AtomicUsize>,
    }

    impl Runtime for SlowRuntime {
        fn load(&mut self) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn execute(&mut self, _: &str, _: &mut dyn ExecutionHooks) -> Result<(), ScriptError> {
            Ok(())
        }

        fn convert(
            &mut self,
            _: jac_playground::protocol::ConversionDirection,
            source: &str,
        ) -> Result<String, RuntimeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                thread::sleep(Duration::from_millis(300));
                return Ok(format!("stale {}", source));
            }
            Ok(format!("fresh {}", source))
        }
    }

    #[test]
    fn test_round_trip_through_the_worker() {
        let mut controller = ready_controller();
        let python = "x = 1\nprint(x)\n";
        let jac = convert_python_to_jac(&mut controller, python).unwrap();
        assert_eq!(jac, "with entry {\n    x = 1;\n    print(x);\n}\n");
        assert_eq!(convert_jac_to_python(&mut controller, &jac).unwrap(), python);
    }

    #[test]
    fn test_failed_conversion_carries_the_message() {
        let mut controller = ready_controller();
        match convert_jac_to_python(&mut controller, "with entry {\n") {
            Err(PlaygroundError::ConversionFailed(message)) => {
                assert!(message.contains("never closed"), "got {}", message)
            }
            other => panic!("expected a failed conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_conversion_rejected_during_a_session() {
        let mut controller = ready_controller();
        controller.set_breakpoints(&[1]).unwrap();
        controller.start_execution(FIVE_PRINTS).unwrap();
        assert_eq!(expect_break(&mut controller), 1);
        assert!(matches!(
            convert_python_to_jac(&mut controller, "x = 1\n"),
            Err(PlaygroundError::SessionActive)
        ));
        controller.terminate().unwrap();
        run_until_stop(&mut controller);
    }

    #[test]
    fn test_timeout_restores_output_callbacks() {
        let config = PlaygroundConfig {
            conversion_timeout_ms: 50,
            ..PlaygroundConfig::default()
        };
        let runtime = SlowRuntime {
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let mut controller = ThreadController::new(config, Box::new(runtime));
        assert!(controller.initialize().unwrap());
        let _ = controller.on_stdout(|_| {});
        let _ = controller.on_stderr(|_| {});

        let err = convert_python_to_jac(&mut controller, "x = 1\n").unwrap_err();
        assert!(matches!(err, PlaygroundError::ConversionTimeout { millis: 50 }));
        assert_eq!(err.to_string(), "conversion timeout - no reply after 50ms");
        assert!(controller.subscriptions_mut().has_stdout(), "stdout restored");
        assert!(controller.subscriptions_mut().has_stderr(), "stderr restored");

        // Let the late reply land, then make sure it is not mistaken for ours.
        thread::sleep(Duration::from_millis(400));
        let output = convert_python_to_jac(&mut controller, "y = 2\n").unwrap();
        assert_eq!(output, "fresh y = 2\n");
    }
}
