//! Repeated inflation into one host

use super::{InflateError, Inflation, Inflator};
use crate::host::{HostTypeSystem, ObjectId};

/// Keeps one host in sync with a template across state changes
///
/// The first [`inflate`](Self::inflate) builds the tree; every later call
/// updates it in place through [`Inflator::update`]. Nothing tracks which
/// host state a binding read, so the caller decides when to re-inflate.
#[derive(Debug, Clone)]
pub struct ReactiveInflator {
    inflator: Inflator,
    host: ObjectId,
    current: Option<Inflation>,
}

impl ReactiveInflator {
    pub fn new(inflator: Inflator, host: ObjectId) -> Self {
        Self {
            inflator,
            host,
            current: None,
        }
    }

    pub fn host(&self) -> ObjectId {
        self.host
    }

    pub fn inflator(&self) -> &Inflator {
        &self.inflator
    }

    /// Result of the latest successful pass
    pub fn current(&self) -> Option<&Inflation> {
        self.current.as_ref()
    }

    /// Inflate the host, or bring it up to date when it was inflated before
    pub fn inflate(&mut self, system: &mut dyn HostTypeSystem) -> Result<&Inflation, InflateError> {
        let inflation = match self.current.take() {
            None => self.inflator.inflate(system, self.host)?,
            Some(mut inflation) => {
                if let Err(err) = self.inflator.update(system, &mut inflation) {
                    // Keep the last good state so a later pass still reuses its objects
                    self.current = Some(inflation);
                    return Err(err);
                }
                inflation
            }
        };
        Ok(&*self.current.insert(inflation))
    }
}
