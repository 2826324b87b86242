// ABOUTME: Heuristic tables driving login detection and action-control search
// ABOUTME: Ordered locator lists and keyword sets, tried in sequence with early exit

/// Candidate username/email field locators, tried in order.
pub const USERNAME_LOCATORS: &[&str] = &[
    "input[name='email']",
    "input[name='username']",
    "input[type='email']",
    "#email",
    "#username",
];

/// Candidate password field locators, tried in order.
pub const PASSWORD_LOCATORS: &[&str] = &[
    "input[name='password']",
    "input[type='password']",
    "#password",
];

/// Generic submit/continue control used for login and two-step flows.
pub const SUBMIT_LOCATOR: &str = "button[type='submit']";

/// Optional confirmation dialog control dismissed after an action click.
pub const CONFIRM_LOCATOR: &str = "button:contains('Confirm')";

/// URL substrings that mark a page as login-like.
pub const LOGIN_URL_HINTS: &[&str] = &["login", "signin", "auth", "sign-in"];

/// Link/button texts that identify the action control on renewal pages.
pub const ACTION_KEYWORDS: &[&str] = &["Renew", "renew", "Extend", "extend", "续期", "续订"];

/// Name of the task selector that short-circuits action-control discovery.
pub const CUSTOM_ACTION_SELECTOR: &str = "renew_btn";

/// Strategies for locating the action control, in strict priority order.
/// The search stops at the first strategy that clicks something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStrategy {
    /// Explicit `renew_btn` locator supplied by the task.
    CustomSelector,
    /// Exact link-text match against [`ACTION_KEYWORDS`].
    ExactLinkText,
    /// Partial link-text match against [`ACTION_KEYWORDS`].
    PartialLinkText,
    /// Script scan over clickable elements whose text or value contains a keyword.
    ScriptScan,
}

impl ActionStrategy {
    pub const ORDER: [ActionStrategy; 4] = [
        ActionStrategy::CustomSelector,
        ActionStrategy::ExactLinkText,
        ActionStrategy::PartialLinkText,
        ActionStrategy::ScriptScan,
    ];
}

/// In-page scan over `button`, `a`, submit inputs, and ARIA buttons. Clicks
/// the first element whose text or value contains an action keyword and
/// returns whether anything was clicked.
pub fn action_scan_script() -> String {
    let keywords = serde_json::to_string(ACTION_KEYWORDS).expect("static keyword list");
    format!(
        r#"const keywords = {keywords};
const controls = Array.from(document.querySelectorAll('button, a, input[type="submit"], [role="button"]'));
for (const el of controls) {{
    if (keywords.some(kw => (el.textContent || el.value || '').includes(kw))) {{
        el.click();
        return true;
    }}
}}
return false;"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order_starts_with_custom_selector() {
        assert_eq!(ActionStrategy::ORDER[0], ActionStrategy::CustomSelector);
        assert_eq!(
            ActionStrategy::ORDER.last(),
            Some(&ActionStrategy::ScriptScan)
        );
    }

    #[test]
    fn test_scan_script_embeds_keywords() {
        let script = action_scan_script();
        for kw in ACTION_KEYWORDS {
            assert!(script.contains(kw), "script missing keyword {kw}");
        }
        assert!(script.contains("[role=\"button\"]"));
    }
}
