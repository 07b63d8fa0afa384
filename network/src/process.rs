//! Cooperative processes
//!
//! Processes are event handlers that run one at a time until they return.
//! [`Scheduler`] is the small run list used to drive them: events are queued
//! and delivered in order, and each handler gets exclusive `&mut` access to
//! the stack while it runs.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use log::debug;

/// Events delivered to a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// First event after the process is started
    Init,
    /// The IP stack processed traffic
    Tcpip,
    /// A timer expired
    Timer,
    /// Periodic poll request
    Poll,
    /// The process must terminate
    Exit,
}

impl core::fmt::Display for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Event::Init => write!(f, "Init"),
            Event::Tcpip => write!(f, "Tcpip"),
            Event::Timer => write!(f, "Timer"),
            Event::Poll => write!(f, "Poll"),
            Event::Exit => write!(f, "Exit"),
        }
    }
}

/// What a process reports after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Suspended until the next event
    Waiting,
    /// Finished; never scheduled again
    Exited,
}

/// Handle of a started process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(usize);

/// State handed to a process for the duration of one event
pub struct Context<'a, S: ?Sized> {
    pub stack: &'a mut S,
    pub now_ms: i64,
    raised: &'a mut Vec<Event>,
}

impl<'a, S: ?Sized> Context<'a, S> {
    pub fn new(stack: &'a mut S, now_ms: i64, raised: &'a mut Vec<Event>) -> Self {
        Self {
            stack,
            now_ms,
            raised,
        }
    }

    /// Queue `event` for every running process
    pub fn broadcast(&mut self, event: Event) {
        self.raised.push(event);
    }
}

/// A cooperative task
pub trait Process<S: ?Sized> {
    fn name(&self) -> &'static str;

    /// Run until the next suspension point
    fn handle(&mut self, event: Event, ctx: &mut Context<'_, S>) -> Status;
}

/// Something processes can be started on
pub trait Spawner<S: ?Sized> {
    /// Start `process`; it receives [`Event::Init`] before anything else
    fn start(&mut self, process: Box<dyn Process<S>>) -> ProcessId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    One(ProcessId),
    All,
}

/// Single-threaded run list
pub struct Scheduler<S: ?Sized> {
    processes: Vec<Option<Box<dyn Process<S>>>>,
    queue: VecDeque<(Target, Event)>,
}

impl<S: ?Sized> Default for Scheduler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> Scheduler<S> {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Queue `event` for one process
    pub fn post(&mut self, pid: ProcessId, event: Event) {
        self.queue.push_back((Target::One(pid), event));
    }

    /// Queue `event` for every running process
    pub fn broadcast(&mut self, event: Event) {
        self.queue.push_back((Target::All, event));
    }

    /// Ask a process to terminate at its next event
    pub fn exit(&mut self, pid: ProcessId) {
        self.post(pid, Event::Exit);
    }

    pub fn is_running(&self, pid: ProcessId) -> bool {
        matches!(self.processes.get(pid.0), Some(Some(_)))
    }

    /// Number of running processes
    pub fn running(&self) -> usize {
        self.processes.iter().filter(|p| p.is_some()).count()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Deliver queued events until the queue is empty
    ///
    /// Events raised by handlers are queued behind the current ones.
    /// Returns the number of deliveries made.
    pub fn run(&mut self, stack: &mut S, now_ms: i64) -> usize {
        let mut delivered = 0;
        let mut raised = Vec::new();

        while let Some((target, event)) = self.queue.pop_front() {
            let pids: Vec<usize> = match target {
                Target::One(pid) => vec![pid.0],
                Target::All => (0..self.processes.len()).collect(),
            };

            for idx in pids {
                let Some(slot) = self.processes.get_mut(idx) else {
                    continue;
                };
                let Some(process) = slot.as_mut() else {
                    continue;
                };

                let mut ctx = Context::new(&mut *stack, now_ms, &mut raised);
                let status = process.handle(event, &mut ctx);
                delivered += 1;

                if status == Status::Exited {
                    debug!("process {} ({}) exited", idx, process.name());
                    *slot = None;
                }
            }

            for event in raised.drain(..) {
                self.queue.push_back((Target::All, event));
            }
        }

        delivered
    }
}

impl<S: ?Sized> Spawner<S> for Scheduler<S> {
    fn start(&mut self, process: Box<dyn Process<S>>) -> ProcessId {
        let pid = ProcessId(self.processes.len());
        debug!("starting process {} ({})", pid.0, process.name());
        self.processes.push(Some(process));
        self.post(pid, Event::Init);
        pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    /// Records every event and exits on `Exit`
    struct Recorder {
        seen: Rc<RefCell<Vec<Event>>>,
        raise_on_poll: Option<Event>,
    }

    impl Process<u32> for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&mut self, event: Event, ctx: &mut Context<'_, u32>) -> Status {
            self.seen.borrow_mut().push(event);
            *ctx.stack += 1;
            if event == Event::Poll {
                if let Some(raised) = self.raise_on_poll {
                    ctx.broadcast(raised);
                }
            }
            if event == Event::Exit {
                Status::Exited
            } else {
                Status::Waiting
            }
        }
    }

    fn recorder(raise_on_poll: Option<Event>) -> (Box<dyn Process<u32>>, Rc<RefCell<Vec<Event>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let process: Box<dyn Process<u32>> = Box::new(Recorder {
            seen: seen.clone(),
            raise_on_poll,
        });
        (process, seen)
    }

    #[test]
    fn test_start_delivers_init_first() {
        let mut sched = Scheduler::new();
        let mut stack = 0u32;
        let (process, seen) = recorder(None);

        let pid = sched.start(process);
        sched.post(pid, Event::Timer);
        sched.run(&mut stack, 0);

        assert_eq!(*seen.borrow(), vec![Event::Init, Event::Timer]);
        assert_eq!(stack, 2);
    }

    #[test]
    fn test_exited_process_gets_no_more_events() {
        let mut sched = Scheduler::new();
        let mut stack = 0u32;
        let (process, seen) = recorder(None);

        let pid = sched.start(process);
        sched.exit(pid);
        sched.post(pid, Event::Timer);
        sched.broadcast(Event::Tcpip);
        sched.run(&mut stack, 0);

        assert_eq!(*seen.borrow(), vec![Event::Init, Event::Exit]);
        assert!(!sched.is_running(pid));
        assert_eq!(sched.running(), 0);
    }

    #[test]
    fn test_raised_events_reach_all_processes() {
        let mut sched = Scheduler::new();
        let mut stack = 0u32;
        let (first, first_seen) = recorder(Some(Event::Tcpip));
        let (second, second_seen) = recorder(None);

        let first_pid = sched.start(first);
        sched.start(second);
        sched.run(&mut stack, 0);

        sched.post(first_pid, Event::Poll);
        let delivered = sched.run(&mut stack, 10);

        assert_eq!(delivered, 3);
        assert_eq!(*first_seen.borrow(), vec![Event::Init, Event::Poll, Event::Tcpip]);
        assert_eq!(*second_seen.borrow(), vec![Event::Init, Event::Tcpip]);
        assert!(!sched.has_pending());
    }
}
