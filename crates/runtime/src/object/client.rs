use std::sync::Arc;

use nvif_protocol::{NV_DEVICE, NVIF_CLASS_CLIENT};
use serde_json::Value;

use super::{Context, DeviceObject, Object};
use crate::error::DispatchError;

/// The object at handle `0` of every session.
#[derive(Debug, Default)]
pub(crate) struct ClientObject;

impl Object for ClientObject {
	fn class(&self) -> u32 {
		NVIF_CLASS_CLIENT
	}

	fn sclass(&self, _ctx: &Context<'_>) -> Vec<u32> {
		vec![NV_DEVICE]
	}

	fn new_child(&self, ctx: &Context<'_>, _class: u32, args: &Value) -> Result<Arc<dyn Object>, DispatchError> {
		Ok(Arc::new(DeviceObject::create(ctx, args)?))
	}
}
