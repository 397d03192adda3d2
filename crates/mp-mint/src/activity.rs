use tracing::info;

/// Append-only, user-visible activity log.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    lines: Vec<String>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self {
            lines: vec!["Ready.".to_owned()],
        }
    }
}

impl ActivityLog {
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "activity", "{}", line);
        self.lines.push(line);
    }

    pub fn failure(&mut self, reason: impl std::fmt::Display) {
        self.push(format!("❌ {reason}"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn since(&self, seen: usize) -> &[String] {
        self.lines.get(seen..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ready_and_only_appends() {
        let mut log = ActivityLog::default();
        log.push("Minting 1 for 0.001 ETH…");
        log.failure("Sale is not active.");

        assert_eq!(log.render(), "Ready.\nMinting 1 for 0.001 ETH…\n❌ Sale is not active.");
        assert_eq!(log.since(1).len(), 2);
        assert!(log.since(10).is_empty());
    }
}
