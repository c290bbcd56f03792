//! Formulations of the tool switching problem as min-cost flow networks.
//!
//! A builder turns an [`Instance`] into a [`FlowNetwork`] with source and
//! sink set. Arcs that every feasible schedule must use are added as
//! mandatory arcs and discounted by a penalty `K`, so that the cost
//! minimising flow always prefers them; the solver adds the discount back
//! when it reports the cost.

mod lsg;

pub use lsg::{LsgBuilder, LsgLayout, Occurrence, VertexRole};

use crate::graph::FlowNetwork;
use crate::{FlowError, Instance};

pub trait NetworkBuilder {
    fn name(&self) -> &str;

    /// Builds the network for `instance`. `penalty > 0` is used as the
    /// mandatory-arc discount; any other value asks for
    /// [`NetworkBuilder::automatic_penalty`].
    fn build_from_instance(
        &self,
        instance: &Instance,
        penalty: i64,
    ) -> Result<FlowNetwork, FlowError>;

    /// Discount used when the caller does not fix one. Must exceed the switch
    /// cost of any flow in the formulation.
    fn automatic_penalty(&self, instance: &Instance) -> Result<i64, FlowError> {
        dominant_penalty(instance)
    }

    fn resolve_penalty(&self, instance: &Instance, penalty: i64) -> Result<i64, FlowError> {
        if penalty > 0 {
            Ok(penalty)
        } else {
            self.automatic_penalty(instance)
        }
    }
}

/// One more than the cost of loading every required tool at every job it is
/// required at.
pub fn dominant_penalty(instance: &Instance) -> Result<i64, FlowError> {
    instance
        .requirements
        .iter()
        .flatten()
        .try_fold(1_i64, |acc, &tool| {
            instance
                .tool_cost(tool)
                .and_then(|cost| acc.checked_add(cost))
        })
        .ok_or_else(|| {
            FlowError::InvalidInput("tool costs overflow the penalty bound".to_string())
        })
}
