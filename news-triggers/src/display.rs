use std::collections::HashSet;
use std::io::Write;

use tracing::{debug, error};

use crate::types::{NewsItem, Presenter};

const TITLE_RULE: &str = "---------------------------------------------------------------";
const ITEM_RULE: &str = "*************************";

/// Identifiers already shown to the user.
///
/// Owned by whoever presents items, never by the trigger engine. It only
/// grows; items are not forgotten between polls.
#[derive(Debug, Clone, Default)]
pub struct SeenGuids {
    seen: HashSet<String>,
}

impl SeenGuids {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `guid`. Returns true if it had not been seen before.
    pub fn insert_if_absent(&mut self, guid: &str) -> bool {
        if self.seen.contains(guid) {
            return false;
        }
        self.seen.insert(guid.to_string())
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.seen.contains(guid)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Writes each new item as a text block: title, rule, description, link.
pub struct ConsolePresenter<W: Write> {
    out: W,
    seen: SeenGuids,
}

impl ConsolePresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            seen: SeenGuids::new(),
        }
    }

    pub fn seen(&self) -> &SeenGuids {
        &self.seen
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_item(&mut self, item: &NewsItem) -> std::io::Result<()> {
        writeln!(self.out, "{}", item.title)?;
        writeln!(self.out, "{}", TITLE_RULE)?;
        if !item.description.is_empty() {
            writeln!(self.out, "{}", item.description)?;
        }
        writeln!(self.out, "{}", item.link)?;
        writeln!(self.out, "{}", ITEM_RULE)?;
        self.out.flush()
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn present(&mut self, item: &NewsItem) -> bool {
        if self.seen.contains(&item.guid) {
            debug!("Already shown: {}", item.guid);
            return false;
        }
        // Only a completed write counts as shown, so a failed item is retried next poll
        if let Err(e) = self.write_item(item) {
            error!("Failed to display '{}': {}", item.title, e);
            return false;
        }
        self.seen.insert_if_absent(&item.guid)
    }
}
