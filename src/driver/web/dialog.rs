use crate::parser::types::DialogAction;

/// In-page interceptor for native dialogs.
///
/// The binding crate does not surface dialog events, so the driver wraps
/// `window.alert` / `confirm` / `prompt` after every navigation. Intercepted
/// dialogs are recorded in arrival order and answered with the currently
/// armed action. Installation is idempotent; re-running only updates the
/// armed action.
pub const INSTALL_HOOK_JS: &str = r#"action => {
    if (!window.__uiprobeDialogs) {
        const state = { records: [], action: action };
        window.__uiprobeDialogs = state;
        window.alert = msg => {
            state.records.push({ kind: 'alert', message: String(msg) });
        };
        window.confirm = msg => {
            state.records.push({ kind: 'confirm', message: String(msg) });
            return state.action === 'accept';
        };
        window.prompt = (msg, fallback) => {
            state.records.push({ kind: 'prompt', message: String(msg) });
            return state.action === 'accept' ? (fallback ?? '') : null;
        };
    } else {
        window.__uiprobeDialogs.action = action;
    }
}"#;

/// Pop the oldest recorded dialog, or null.
pub const TAKE_DIALOG_JS: &str = r#"() => {
    const state = window.__uiprobeDialogs;
    return state && state.records.length ? state.records.shift() : null;
}"#;

pub fn action_keyword(action: DialogAction) -> &'static str {
    match action {
        DialogAction::Accept => "accept",
        DialogAction::Dismiss => "dismiss",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_keywords() {
        assert_eq!(action_keyword(DialogAction::Accept), "accept");
        assert_eq!(action_keyword(DialogAction::Dismiss), "dismiss");
    }

    #[test]
    fn test_hook_guards_reinstall() {
        // The hook must not re-wrap alert on a second install, or records
        // would be lost with the replaced state object.
        assert!(INSTALL_HOOK_JS.contains("if (!window.__uiprobeDialogs)"));
        assert!(INSTALL_HOOK_JS.contains("window.__uiprobeDialogs.action = action"));
    }
}
