use crate::catalog::descriptor::ElementDescriptor;
use crate::report::report_model::ActionKind;

/// Roles that make any element clickable.
pub const CLICK_ROLES: [&str; 4] = ["button", "link", "menuitem", "tab"];

/// Input types filled with a sample value.
pub const FILLABLE_TYPES: [&str; 8] = [
    "text", "email", "password", "search", "tel", "url", "number", "date",
];

pub const TEXTAREA_SAMPLE: &str = "This is a test text for the textarea.";

/// What the dispatcher will do to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    Click,
    Fill(String),
    Check,
    /// Option chosen at action time from the live option list
    SelectFirst,
    /// Nothing to do; the element is inert for probing
    Inert,
}

impl ActionPlan {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPlan::Click => ActionKind::Click,
            ActionPlan::Fill(_) => ActionKind::Fill,
            ActionPlan::Check => ActionKind::Check,
            ActionPlan::SelectFirst => ActionKind::Select,
            ActionPlan::Inert => ActionKind::None,
        }
    }
}

/// Pick the action for an element from its tag, role and input type.
pub fn plan_action(element: &ElementDescriptor) -> ActionPlan {
    let role = element.role().map(str::to_lowercase);
    let role = role.as_deref();

    match element.tag.as_str() {
        "button" | "a" => ActionPlan::Click,
        _ if role.is_some_and(|r| CLICK_ROLES.contains(&r)) => ActionPlan::Click,
        "input" => {
            let input_type = element.input_type();
            match input_type.as_str() {
                "checkbox" | "radio" => ActionPlan::Check,
                t if FILLABLE_TYPES.contains(&t) => ActionPlan::Fill(sample_value(t).to_string()),
                _ => ActionPlan::Inert,
            }
        }
        "select" => ActionPlan::SelectFirst,
        "textarea" => ActionPlan::Fill(TEXTAREA_SAMPLE.to_string()),
        _ if matches!(role, Some("checkbox" | "radio")) => ActionPlan::Check,
        _ => ActionPlan::Inert,
    }
}

/// One representative value per input type.
pub fn sample_value(input_type: &str) -> &'static str {
    match input_type {
        "email" => "test@example.com",
        "number" => "123",
        "date" => "2024-01-01",
        "url" => "https://example.com",
        "tel" => "+15555550100",
        "password" => "Test1234!",
        _ => "test",
    }
}

/// Log-friendly description of the action, e.g. `fill input type='email'`.
pub fn describe_action(plan: &ActionPlan, element: &ElementDescriptor) -> String {
    match plan {
        ActionPlan::Click => format!("click {}", element.tag),
        ActionPlan::Fill(_) if element.tag == "textarea" => "fill textarea".to_string(),
        ActionPlan::Fill(_) => format!("fill input type='{}'", element.input_type()),
        ActionPlan::Check if element.tag == "input" => {
            format!("check input type='{}'", element.input_type())
        }
        ActionPlan::Check => format!("check {}", element.tag),
        ActionPlan::SelectFirst => "select option".to_string(),
        ActionPlan::Inert => format!("interact with {}", element.tag),
    }
}
