//! Remote control of the dialog library running inside a surface.
//!
//! Each call becomes one `Swal.<method>(...)` expression. Arguments are
//! JSON-encoded, so caller strings never leave the string literal they are
//! placed in.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    EnableButtons,
    DisableButtons,
    ShowLoading,
    HideLoading,
    IsLoading,
    ClickConfirm,
    ClickCancel,
    ClickDeny,
    ShowValidationMessage(String),
    ResetValidationMessage,
    DisableInput,
    EnableInput,
    GetTimerLeft,
    StopTimer,
    ResumeTimer,
    ToggleTimer,
    IsTimerRunning,
    IncreaseTimer(i64),
    IsValidParameter(String),
    IsUpdatableParameter(String),
}

impl RemoteCall {
    pub fn method(&self) -> &'static str {
        match self {
            RemoteCall::EnableButtons => "enableButtons",
            RemoteCall::DisableButtons => "disableButtons",
            RemoteCall::ShowLoading => "showLoading",
            RemoteCall::HideLoading => "hideLoading",
            RemoteCall::IsLoading => "isLoading",
            RemoteCall::ClickConfirm => "clickConfirm",
            RemoteCall::ClickCancel => "clickCancel",
            RemoteCall::ClickDeny => "clickDeny",
            RemoteCall::ShowValidationMessage(_) => "showValidationMessage",
            RemoteCall::ResetValidationMessage => "resetValidationMessage",
            RemoteCall::DisableInput => "disableInput",
            RemoteCall::EnableInput => "enableInput",
            RemoteCall::GetTimerLeft => "getTimerLeft",
            RemoteCall::StopTimer => "stopTimer",
            RemoteCall::ResumeTimer => "resumeTimer",
            RemoteCall::ToggleTimer => "toggleTimer",
            RemoteCall::IsTimerRunning => "isTimerRunning",
            RemoteCall::IncreaseTimer(_) => "increaseTimer",
            RemoteCall::IsValidParameter(_) => "isValidParameter",
            RemoteCall::IsUpdatableParameter(_) => "isUpdatableParameter",
        }
    }

    fn argument(&self) -> Option<Value> {
        match self {
            RemoteCall::ShowValidationMessage(s)
            | RemoteCall::IsValidParameter(s)
            | RemoteCall::IsUpdatableParameter(s) => Some(Value::String(s.clone())),
            RemoteCall::IncreaseTimer(n) => Some(Value::from(*n)),
            _ => None,
        }
    }

    /// Calls that change the popup height; the surface is asked to refit.
    pub fn resizes_popup(&self) -> bool {
        matches!(
            self,
            RemoteCall::ShowValidationMessage(_) | RemoteCall::ResetValidationMessage
        )
    }

    pub fn to_script(&self) -> String {
        let args = self.argument().map(|v| v.to_string()).unwrap_or_default();
        format!("Swal.{}({})", self.method(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_calls() {
        assert_eq!(RemoteCall::ClickConfirm.to_script(), "Swal.clickConfirm()");
        assert_eq!(RemoteCall::IncreaseTimer(1500).to_script(), "Swal.increaseTimer(1500)");
        assert_eq!(
            RemoteCall::IsUpdatableParameter("title".into()).to_script(),
            "Swal.isUpdatableParameter(\"title\")"
        );
    }

    #[test]
    fn test_arguments_are_escaped() {
        let call = RemoteCall::ShowValidationMessage("it's \"bad\"');alert(1)//".into());
        assert_eq!(
            call.to_script(),
            r#"Swal.showValidationMessage("it's \"bad\"');alert(1)//")"#
        );
    }

    #[test]
    fn test_resizing_calls() {
        assert!(RemoteCall::ResetValidationMessage.resizes_popup());
        assert!(RemoteCall::ShowValidationMessage(String::new()).resizes_popup());
        assert!(!RemoteCall::ShowLoading.resizes_popup());
    }
}
