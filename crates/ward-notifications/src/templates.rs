use std::collections::HashMap;

use serde_json::{Value, json};
use ward_core::clock::format_rfc3339;
use ward_core::model::{EmergencyEvent, HandoverRecord};
use ward_core::{WardEvent, WardEventType};

use crate::adapters::RenderedContent;
use crate::error::NotificationError;

/// Simple template renderer using {{variable}} syntax
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<String, Template>,
}

#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub subject: Option<String>,
    pub body: String,
}

impl Template {
    pub fn new(id: impl Into<String>, subject: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.map(str::to_string),
            body: body.into(),
        }
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Renderer with a template for every [`WardEventType`], keyed by the
    /// event type name.
    pub fn with_ward_defaults() -> Self {
        let mut renderer = Self::new();
        renderer.register(Template::new(
            WardEventType::EmergencyRaised.as_str(),
            Some("[{{severity}}] Emergency on {{ward}}"),
            "{{type}} reported by {{reporter}} for admission {{admission_id}} at {{reported_at}}. {{description}}",
        ));
        renderer.register(Template::new(
            WardEventType::EmergencyEscalated.as_str(),
            Some("[{{severity}}] Emergency escalated to {{escalation_target}}"),
            "Emergency {{emergency_id}} ({{type}}) on {{ward}} escalated by {{escalated_by}}: {{escalation_reason}}",
        ));
        renderer.register(Template::new(
            WardEventType::EmergencyResolved.as_str(),
            Some("Emergency resolved on {{ward}}"),
            "Emergency {{emergency_id}} ({{type}}) resolved by {{resolved_by}}: {{outcome}}",
        ));
        renderer.register(Template::new(
            WardEventType::HandoverCreated.as_str(),
            Some("Shift handover on {{ward}}"),
            "{{author}} handed over: {{key_points}}. Risk alerts: {{risk_alerts}}. Pending: {{pending_tasks}}",
        ));
        renderer
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, template_id: &str) -> Option<&Template> {
        self.templates.get(template_id)
    }

    pub fn render(
        &self,
        template_id: &str,
        data: &HashMap<String, Value>,
    ) -> Result<RenderedContent, NotificationError> {
        let template = self
            .templates
            .get(template_id)
            .ok_or(NotificationError::TemplateNotFound(template_id.to_string()))?;

        let subject = template
            .subject
            .as_ref()
            .map(|s| self.render_string(s, data));
        let body = self.render_string(&template.body, data);

        Ok(RenderedContent { subject, body })
    }

    fn render_string(&self, template: &str, data: &HashMap<String, Value>) -> String {
        let mut result = template.to_string();

        for (key, value) in data {
            let placeholder = format!("{{{{{}}}}}", key);
            let replacement = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                _ => value.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }

        result
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Template variables for an event.
pub fn event_data(event: &WardEvent) -> HashMap<String, Value> {
    let mut data = match event {
        WardEvent::EmergencyRaised(e)
        | WardEvent::EmergencyEscalated(e)
        | WardEvent::EmergencyResolved(e) => emergency_data(e),
        WardEvent::HandoverCreated(h) => handover_data(h),
    };
    data.insert("event".into(), json!(event.event_type().as_str()));
    data.insert("ward".into(), json!(event.ward().as_str()));
    data
}

fn emergency_data(e: &EmergencyEvent) -> HashMap<String, Value> {
    HashMap::from([
        ("emergency_id".into(), json!(e.id.as_str())),
        ("admission_id".into(), json!(e.admission.as_str())),
        ("type".into(), json!(e.event_type)),
        ("severity".into(), json!(e.severity.as_str())),
        ("status".into(), json!(e.status.as_str())),
        ("description".into(), json!(e.description)),
        ("reporter".into(), json!(e.reporter.as_str())),
        ("reported_at".into(), json!(format_rfc3339(e.reported_at))),
        (
            "escalated_by".into(),
            json!(e.escalated_by.as_ref().map(|s| s.as_str())),
        ),
        (
            "escalation_target".into(),
            json!(e.escalation_target.map(|r| r.as_str())),
        ),
        ("escalation_reason".into(), json!(e.escalation_reason)),
        ("escalation_count".into(), json!(e.escalation_count)),
        (
            "resolved_by".into(),
            json!(e.resolved_by.as_ref().map(|s| s.as_str())),
        ),
        ("outcome".into(), json!(e.outcome)),
    ])
}

fn handover_data(h: &HandoverRecord) -> HashMap<String, Value> {
    HashMap::from([
        ("handover_id".into(), json!(h.id.as_str())),
        (
            "admission_id".into(),
            json!(h.admission.as_ref().map(|a| a.as_str())),
        ),
        ("author".into(), json!(h.author.as_str())),
        ("key_points".into(), json!(h.content.key_points)),
        ("clinical_update".into(), json!(h.content.clinical_update)),
        ("pending_tasks".into(), json!(h.content.pending_tasks.join("; "))),
        ("risk_alerts".into(), json!(h.content.risk_alerts.join("; "))),
        (
            "supersedes".into(),
            json!(h.supersedes.as_ref().map(|s| s.as_str())),
        ),
        ("created_at".into(), json!(format_rfc3339(h.created_at))),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use ward_core::model::{HandoverContent, Role, Severity};
    use ward_core::{AdmissionId, StaffId, WardId};

    fn raised() -> EmergencyEvent {
        EmergencyEvent::raise(
            AdmissionId::new("adm-1"),
            WardId::new("ward-a"),
            StaffId::new("rn-1"),
            "fall",
            Severity::High,
            "found on floor",
            datetime!(2024-03-01 08:00:00 UTC),
        )
        .unwrap()
    }

    #[test]
    fn test_render_template() {
        let mut renderer = TemplateRenderer::new();
        renderer.register(Template::new("test", Some("Bed {{bed}}"), "Count {{count}}"));

        let mut data = HashMap::new();
        data.insert("bed".to_string(), json!("101-A"));
        data.insert("count".to_string(), json!(5));

        let result = renderer.render("test", &data).unwrap();
        assert_eq!(result.subject.unwrap(), "Bed 101-A");
        assert_eq!(result.body, "Count 5");
    }

    #[test]
    fn test_template_not_found() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("nonexistent", &HashMap::new());
        assert!(matches!(
            result,
            Err(NotificationError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_defaults_cover_every_event_type() {
        let renderer = TemplateRenderer::with_ward_defaults();
        for event_type in WardEventType::ALL {
            assert!(renderer.get(event_type.as_str()).is_some(), "{event_type}");
        }
    }

    #[test]
    fn test_raised_emergency_rendering() {
        let renderer = TemplateRenderer::with_ward_defaults();
        let event = WardEvent::EmergencyRaised(raised());
        let content = renderer
            .render("emergency_raised", &event_data(&event))
            .unwrap();
        assert_eq!(content.subject.as_deref(), Some("[high] Emergency on ward-a"));
        assert_eq!(
            content.body,
            "fall reported by rn-1 for admission adm-1 at 2024-03-01T08:00:00Z. found on floor"
        );
    }

    #[test]
    fn test_escalated_emergency_rendering() {
        let mut ev = raised();
        ev.escalate(
            &StaffId::new("system"),
            "escalation budget exceeded",
            Role::Doctor,
            datetime!(2024-03-01 08:20:00 UTC),
        )
        .unwrap();
        let renderer = TemplateRenderer::with_ward_defaults();
        let content = renderer
            .render(
                "emergency_escalated",
                &event_data(&WardEvent::EmergencyEscalated(ev.clone())),
            )
            .unwrap();
        assert_eq!(
            content.subject.as_deref(),
            Some("[high] Emergency escalated to doctor")
        );
        assert!(content.body.contains("escalated by system: escalation budget exceeded"));
        assert!(content.body.contains(ev.id.as_str()));
    }

    #[test]
    fn test_handover_rendering_joins_lists() {
        let record = HandoverRecord::new(
            WardId::new("ward-a"),
            None,
            StaffId::new("rn-1"),
            HandoverContent {
                key_points: "bed 4 febrile".into(),
                pending_tasks: vec!["repeat obs".into(), "chase bloods".into()],
                risk_alerts: vec!["falls risk".into()],
                ..Default::default()
            },
            datetime!(2024-03-01 19:00:00 UTC),
        )
        .unwrap();
        let renderer = TemplateRenderer::with_ward_defaults();
        let content = renderer
            .render(
                "handover_created",
                &event_data(&WardEvent::HandoverCreated(record)),
            )
            .unwrap();
        assert_eq!(
            content.body,
            "rn-1 handed over: bed 4 febrile. Risk alerts: falls risk. Pending: repeat obs; chase bloods"
        );
    }
}
