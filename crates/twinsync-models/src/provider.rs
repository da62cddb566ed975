//! [`SubstationProvider`]: hands out substation instances by model reference.

use twinsync_core::{ModelError, ModelProvider, SimulationModel};

use crate::params::SubstationParams;
use crate::substation::SubstationModel;
use crate::teststand::MODEL_REF;

/// [`ModelProvider`] for the [`MODEL_REF`] test stand.
#[derive(Clone, Debug, Default)]
pub struct SubstationProvider {
    params: SubstationParams,
}

impl SubstationProvider {
    /// A provider whose instances use `params`.
    pub fn new(params: SubstationParams) -> Self {
        Self { params }
    }
}

impl ModelProvider for SubstationProvider {
    fn instantiate(
        &self,
        model_ref: &str,
        instance_name: &str,
    ) -> Result<Box<dyn SimulationModel>, ModelError> {
        if model_ref != MODEL_REF {
            return Err(ModelError::InstantiationFailed {
                reason: format!("unknown model reference '{model_ref}', expected '{MODEL_REF}'"),
            });
        }
        let model = SubstationModel::new(instance_name, self.params.clone()).map_err(|e| {
            ModelError::InstantiationFailed {
                reason: e.to_string(),
            }
        })?;
        Ok(Box::new(model))
    }
}
