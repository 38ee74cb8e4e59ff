//! Registrations collected at link time.
//!
//! The `#[implementation]` attribute from `sluice-macros` contributes one
//! [`Registrar`] per annotated function to [`IMPLEMENTATIONS`].
//! [`Pipeline::register_collected`] applies every registrar whose service
//! type is declared on the pipeline.

use linkme::distributed_slice;
use tracing::{debug, info};

use crate::error::PipelineResult;
use crate::pipeline::Pipeline;
use crate::service::ServiceKey;

/// A deferred `register_implementation` call.
pub struct Registrar {
    /// Path of the annotated function.
    pub name: &'static str,
    /// Service type the implementation belongs to.
    pub service: fn() -> ServiceKey,
    /// Performs the registration.
    pub register: fn(&Pipeline) -> PipelineResult<()>,
}

/// Every registrar linked into the binary.
#[distributed_slice]
pub static IMPLEMENTATIONS: [Registrar];

impl Pipeline {
    /// Registers every collected implementation whose service type is declared.
    ///
    /// Registrars run sorted by name so the resulting chains do not depend
    /// on link order. Registrars for undeclared service types are skipped.
    /// Returns the number of implementations registered.
    pub fn register_collected(&self) -> PipelineResult<usize> {
        let mut registrars: Vec<&Registrar> = IMPLEMENTATIONS.iter().collect();
        registrars.sort_by_key(|registrar| registrar.name);

        let mut registered = 0;
        for registrar in registrars {
            let service = (registrar.service)();
            if !self.contains(&service) {
                debug!(
                    implementation = registrar.name,
                    service = service.name(),
                    "Service type not declared, skipping collected implementation"
                );
                continue;
            }
            (registrar.register)(self)?;
            registered += 1;
        }

        info!(registered, "Registered collected implementations");
        Ok(registered)
    }
}
