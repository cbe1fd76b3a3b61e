//! Event-loop pipeline over a tree store

use crate::error::BranchError;
use crate::session::Session;
use crate::store::{TreeReader, TreeWriter};

/// One step of an analysis pipeline
///
/// `init` runs once before the first entry and may declare branches and
/// resolve fields; `exec` runs once per stored entry; `finish` runs once
/// after the last entry.
pub trait Task {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Prepare the task
    ///
    /// # Errors
    /// Returns error to abort the run before any entry is read
    fn init(&mut self, session: &mut Session) -> Result<(), BranchError>;

    /// Process the entry currently loaded in `session`
    ///
    /// # Errors
    /// Returns error to abort the run
    fn exec(&mut self, session: &mut Session) -> Result<(), BranchError>;

    /// Release resources after the last entry
    fn finish(&mut self) {}
}

/// Run `tasks` over every entry of `reader`; returns the number of entries
///
/// # Errors
/// Returns the first task or store error; later tasks and entries are not run
pub fn run_tasks(session: &mut Session, reader: &dyn TreeReader, tasks: &mut [Box<dyn Task>]) -> Result<usize, BranchError> {
    run(session, reader, None, tasks)
}

/// Like [`run_tasks`], also writing every branch to `writer` after each entry
///
/// # Errors
/// Returns the first task or store error
pub fn run_tasks_to(
    session: &mut Session,
    reader: &dyn TreeReader,
    writer: &mut dyn TreeWriter,
    tasks: &mut [Box<dyn Task>],
) -> Result<usize, BranchError> {
    run(session, reader, Some(writer), tasks)
}

fn run(
    session: &mut Session,
    reader: &dyn TreeReader,
    mut writer: Option<&mut dyn TreeWriter>,
    tasks: &mut [Box<dyn Task>],
) -> Result<usize, BranchError> {
    let connected = session.connect_input(reader)?;
    tracing::debug!(connected, "input branches connected");

    for task in tasks.iter_mut() {
        tracing::debug!(task = task.name(), "init");
        task.init(session)?;
    }
    if let Some(writer) = writer.as_deref_mut() {
        session.connect_output(writer)?;
    }

    let entries = reader.num_entries();
    for entry in 0..entries {
        session.read_entry(reader, entry)?;
        for task in tasks.iter_mut() {
            task.exec(session)?;
        }
        if let Some(writer) = writer.as_deref_mut() {
            session.fill(writer)?;
        }
    }

    for task in tasks.iter_mut() {
        task.finish();
    }
    tracing::info!(entries, tasks = tasks.len(), "pipeline finished");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTree;
    use atree_core::{BranchConfig, BranchKind};

    struct Failing;

    impl Task for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn init(&mut self, _session: &mut Session) -> Result<(), BranchError> {
            Ok(())
        }

        fn exec(&mut self, _session: &mut Session) -> Result<(), BranchError> {
            Err(BranchError::Task {
                task: self.name().to_string(),
                message: "boom".into(),
            })
        }
    }

    #[test]
    fn empty_store_runs_no_entries() {
        let mut session = Session::new("s");
        let tree = MemoryTree::new();
        let mut tasks: Vec<Box<dyn Task>> = vec![Box::new(Failing)];
        assert_eq!(run_tasks(&mut session, &tree, &mut tasks).unwrap(), 0);
    }

    #[test]
    fn exec_error_aborts() {
        let mut session = Session::new("s");
        let config = BranchConfig::new("event", 0, BranchKind::EventHeader);
        let mut tree = MemoryTree::new();
        tree.attach(&config).unwrap();
        session.add_branch(config).unwrap();
        let header = session.branch("event").unwrap().data().clone();
        tree.write_entry("event", &header).unwrap();

        let mut tasks: Vec<Box<dyn Task>> = vec![Box::new(Failing)];
        let err = run_tasks(&mut session, &tree, &mut tasks).unwrap_err();
        assert!(matches!(err, BranchError::Task { .. }));
    }
}
