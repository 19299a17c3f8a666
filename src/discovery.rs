//! Caller side of fact collection: staging, time budget and output.

use std::{
    path::Path,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    assemble::FactAssembler,
    config::DiscoveryConfig,
    error::{
        DiscoveryError, DiscoveryResultExt, ExtractionError, InternalError, InvalidInputError,
        ReportError,
    },
    facts::Facts,
    xml::Document,
};

/// Read the staged capture, deleting it afterwards unless `keep` is set.
pub fn read_capture(path: impl AsRef<Path>, keep: bool) -> Result<String, DiscoveryError> {
    let path = path.as_ref();
    debug!("Reading inventory capture '{}'", path.display());

    let contents =
        std::fs::read_to_string(path).structured(InvalidInputError::ReadInventory {
            path: path.display().to_string(),
        })?;

    if !keep {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove capture '{}': {e}", path.display());
        }
    }

    Ok(contents)
}

/// Parse a capture and assemble its facts. An empty mapping means the
/// capture held nothing usable and is reported as an error.
pub fn collect_facts(xml: &str, assembler: &FactAssembler) -> Result<Facts, DiscoveryError> {
    let doc = Document::parse(xml).structured(InvalidInputError::ParseInventory)?;
    require_facts(assembler.assemble(&doc)?)
}

fn require_facts(facts: Facts) -> Result<Facts, DiscoveryError> {
    if facts.is_empty() {
        return Err(DiscoveryError::new(ExtractionError::EmptyFacts));
    }
    Ok(facts)
}

/// Run `work` on a worker thread, giving up after `budget`. An abandoned
/// worker is left to finish on its own.
pub fn run_with_timeout<T, F>(budget: Duration, work: F) -> Result<T, DiscoveryError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DiscoveryError> + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("discovery".into())
        .spawn(move || {
            // The receiver is gone if the caller already timed out
            let _ = sender.send(work());
        })
        .structured(InternalError::Internal("Failed to spawn discovery worker"))?;

    match receiver.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(DiscoveryError::new(InternalError::Timeout {
            seconds: budget.as_secs(),
        })),
        Err(RecvTimeoutError::Disconnected) => {
            Err(DiscoveryError::new(InternalError::WorkerPanic))
        }
    }
}

/// Serialize the facts to `path`.
pub fn write_facts(
    facts: &Facts,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), DiscoveryError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(facts)
    } else {
        serde_json::to_string(facts)
    }
    .structured(InternalError::SerializeFacts)?;

    std::fs::write(path.as_ref(), rendered).structured(InternalError::WriteFacts {
        path: path.as_ref().display().to_string(),
    })
}

/// Collect facts for the configured array and write them out.
pub fn discover(config: &DiscoveryConfig) -> Result<Facts, DiscoveryError> {
    info!(
        "Collecting inventory facts for array '{}' as '{}'",
        config.target.server, config.target.username
    );

    let inventory = config.inventory.clone();
    let keep = config.keep_capture;
    let assembler = FactAssembler::new(config.identities.clone(), config.merge_policy);

    let facts = run_with_timeout(config.timeout, move || {
        let xml = read_capture(&inventory, keep)?;
        collect_facts(&xml, &assembler)
    })
    .message("Failed to collect inventory facts")?;

    write_facts(&facts, &config.output, config.pretty)
        .message("Failed to save inventory facts")?;
    info!(
        "Wrote {} facts to '{}'",
        facts.len(),
        config.output.display()
    );

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::Value;

    use crate::{
        assemble::MergePolicy,
        config::ArrayTarget,
        error::ErrorKind,
        extract::IdentityTable,
        facts::test_utils::INVENTORY,
    };

    use super::*;

    fn config(dir: &Path) -> DiscoveryConfig {
        DiscoveryConfig {
            target: ArrayTarget {
                server: "vnx1".into(),
                username: "admin".into(),
                password: None,
            },
            timeout: Duration::from_secs(30),
            output: dir.join("facts.json"),
            inventory: dir.join("capture.xml"),
            keep_capture: false,
            pretty: false,
            merge_policy: MergePolicy::RejectCollisions,
            identities: IdentityTable::default(),
        }
    }

    #[test]
    fn test_read_capture_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.xml");

        std::fs::write(&path, "<a/>").unwrap();
        assert_eq!(read_capture(&path, true).unwrap(), "<a/>");
        assert!(path.exists());

        assert_eq!(read_capture(&path, false).unwrap(), "<a/>");
        assert!(!path.exists());

        let e = read_capture(&path, false).unwrap_err();
        assert!(matches!(
            e.kind(),
            ErrorKind::InvalidInput(InvalidInputError::ReadInventory { .. })
        ));
    }

    #[test]
    fn test_collect_facts() {
        let facts = collect_facts(INVENTORY, &FactAssembler::default()).unwrap();
        assert_eq!(facts["Name"], "APM00123456789");
        assert_eq!(facts["controllers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_facts_are_an_error() {
        let e = require_facts(Facts::new()).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Extraction(ExtractionError::EmptyFacts));
    }

    #[test]
    fn test_collect_facts_invalid_xml() {
        let e = collect_facts("<SAN:SAN>", &FactAssembler::default()).unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::ParseInventory)
        );
    }

    #[test]
    fn test_run_with_timeout() {
        assert_eq!(
            run_with_timeout(Duration::from_secs(5), || Ok(7)).unwrap(),
            7
        );

        let e = run_with_timeout(Duration::from_millis(10), || {
            thread::sleep(Duration::from_secs(2));
            Ok(())
        })
        .unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::Internal(InternalError::Timeout { seconds: 0 })
        );

        let e = run_with_timeout::<(), _>(Duration::from_secs(5), || panic!("boom")).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Internal(InternalError::WorkerPanic));

        let e = run_with_timeout::<(), _>(Duration::from_secs(5), || {
            Err(DiscoveryError::new(ExtractionError::EmptyFacts))
        })
        .unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Extraction(ExtractionError::EmptyFacts));
    }

    #[test]
    fn test_write_facts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");

        let mut facts = Facts::new();
        facts.insert("disk_info".into(), Value::Array(vec![]));
        write_facts(&facts, &path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"disk_info":[]}"#);

        write_facts(&facts, &path, true).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n  \"disk_info\": []\n}"
        );

        let e = write_facts(&facts, PathBuf::from("/non-existent/dir/facts.json"), false)
            .unwrap_err();
        assert!(matches!(
            e.kind(),
            ErrorKind::Internal(InternalError::WriteFacts { .. })
        ));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.inventory, INVENTORY).unwrap();

        let facts = discover(&config).unwrap();
        assert!(!config.inventory.exists());

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&config.output).unwrap()).unwrap();
        assert_eq!(written, Value::Object(facts));
        assert_eq!(written["raid_groups"][0]["0"]["disks"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_discover_missing_capture() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let e = discover(&config).unwrap_err();
        assert!(matches!(
            e.kind(),
            ErrorKind::InvalidInput(InvalidInputError::ReadInventory { .. })
        ));
        assert!(!config.output.exists());
    }
}
