use anyhow::Result;
use std::io::{BufRead, BufReader, Read};

use crate::application::CustomerSync;
use crate::events::CustomerEvent;

/// Result of feeding a batch of events through the sync handlers.
#[derive(Debug, Clone)]
pub struct FeedResult {
    pub applied: usize,
    pub errors: Vec<FeedError>,
}

/// A line that could not be decoded as a customer event.
#[derive(Debug, Clone)]
pub struct FeedError {
    pub line: usize,
    pub error: String,
}

/// Applies a JSON-lines stream of customer lifecycle events to the local
/// projection, standing in for the registry's message transport. Undecodable
/// lines are collected and skipped — the transport may redeliver them — while
/// storage failures abort the feed.
pub struct EventFeed<'a> {
    sync: &'a CustomerSync,
}

impl<'a> EventFeed<'a> {
    pub fn new(sync: &'a CustomerSync) -> Self {
        Self { sync }
    }

    /// Apply events from a JSON-lines reader, one event per line.
    pub async fn apply_json_lines<R: Read>(&self, reader: R) -> Result<FeedResult> {
        let mut applied = 0;
        let mut errors = Vec::new();

        for (line_num, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let event: CustomerEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(e) => {
                    errors.push(FeedError {
                        line: line_num + 1,
                        error: format!("JSON parse error: {}", e),
                    });
                    continue;
                }
            };

            self.sync.apply(&event).await?;
            applied += 1;
        }

        Ok(FeedResult { applied, errors })
    }
}
