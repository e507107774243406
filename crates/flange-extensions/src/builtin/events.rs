use anyhow::{anyhow, Context, Result};
use flange_core::{ConfigNode, NormalizedConfig};
use serde_json::Value;
use std::cmp::Reverse;

use crate::container::{Binding, Definition, ServiceContainer};
use crate::extension::Extension;

pub const DISPATCHER_ID: &str = "events.dispatcher";
pub const LISTENER_TAG: &str = "event_listener";

/// Event dispatcher with tag-discovered listeners
pub struct EventsExtension;

impl Extension for EventsExtension {
    fn alias(&self) -> &str {
        "events"
    }

    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        _config: &NormalizedConfig,
    ) -> Result<()> {
        container.set(Definition::new(DISPATCHER_ID, "flange::event::EventDispatcher").public(true))?;
        Ok(())
    }

    /// Bind every `event_listener` service, highest priority first
    fn boot(&self, container: &mut dyn ServiceContainer) -> Result<()> {
        let mut listeners = Vec::new();
        for (id, attrs) in container.tagged(LISTENER_TAG) {
            let event = attrs
                .get("event")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    anyhow!(
                        "Service \"{}\" must define the \"event\" attribute on \"{}\" tags",
                        id,
                        LISTENER_TAG
                    )
                })?
                .to_string();
            let method = attrs
                .get("method")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("on_{}", event.replace('.', "_")));
            let priority = listener_priority(id, attrs.get("priority"))?;
            listeners.push((id.to_string(), event, method, priority));
        }

        // stable: equal priorities keep definition order
        listeners.sort_by_key(|(_, _, _, priority)| Reverse(*priority));

        tracing::debug!("Binding {} event listeners", listeners.len());
        for (id, event, method, priority) in listeners {
            container.bind(
                Binding::new(DISPATCHER_ID, "add_listener")
                    .arg(event)
                    .arg(serde_json::json!([id, method]))
                    .arg(priority),
            )?;
        }
        Ok(())
    }
}

/// Tag priorities follow the same int coercion as configuration (`"10"` is 10)
fn listener_priority(id: &str, raw: Option<&Value>) -> Result<i64> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Ok(0);
    };
    let normalized = ConfigNode::integer().validate(raw).with_context(|| {
        format!(
            "Invalid \"priority\" on the \"{}\" tag of service \"{}\"",
            LISTENER_TAG, id
        )
    })?;
    normalized
        .value()
        .as_i64()
        .ok_or_else(|| anyhow!("Priority {} of service \"{}\" is out of range", raw, id))
}
