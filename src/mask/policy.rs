use std::collections::BTreeSet;
use std::fmt;

/// Receives the distinct invalid characters found in a piece of text.
///
/// Called at most once per masking call, synchronously, and only when
/// something invalid was found. A panic in `notify` reaches the caller of
/// the masking function.
pub trait InvalidCharNotifier {
    fn notify(&self, text: &str, invalid: &BTreeSet<char>);
}

impl<F> InvalidCharNotifier for F
where
    F: Fn(&str, &BTreeSet<char>),
{
    fn notify(&self, text: &str, invalid: &BTreeSet<char>) {
        self(text, invalid)
    }
}

/// Writes one line per report to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotifier;

impl InvalidCharNotifier for StderrNotifier {
    fn notify(&self, _text: &str, invalid: &BTreeSet<char>) {
        eprintln!(
            "xmlmask: text contains {} invalid character(s): {}",
            invalid.len(),
            format_code_points(invalid)
        );
    }
}

/// `U+0001, U+FFFE` style list, in set order.
pub fn format_code_points(chars: &BTreeSet<char>) -> String {
    chars
        .iter()
        .map(|&c| format!("U+{:04X}", c as u32))
        .collect::<Vec<_>>()
        .join(", ")
}

static STDERR_NOTIFIER: StderrNotifier = StderrNotifier;

/// What the masker does about characters that are invalid for the target
/// position.
#[derive(Clone, Copy)]
pub struct IncorrectCharPolicy<'a> {
    /// Scan the text for invalid characters before masking.
    pub test_required: bool,
    /// Report what the scan found.
    pub notify_required: bool,
    /// When the scan found something, delete controls instead of escaping
    /// them.
    pub replace_with_nothing: bool,
    /// Report target; [`StderrNotifier`] when unset.
    pub notifier: Option<&'a dyn InvalidCharNotifier>,
}

impl IncorrectCharPolicy<'static> {
    /// Escape only, never scan.
    pub const PASS_THROUGH: Self = Self::new(false, false, false);
    /// Scan and report, then escape.
    pub const REPORT: Self = Self::new(true, true, false);
    /// Scan and delete invalid controls without reporting.
    pub const STRIP: Self = Self::new(true, false, true);
    /// Scan, report and delete.
    pub const STRIP_AND_REPORT: Self = Self::new(true, true, true);
}

impl<'a> IncorrectCharPolicy<'a> {
    pub const fn new(
        test_required: bool,
        notify_required: bool,
        replace_with_nothing: bool,
    ) -> Self {
        IncorrectCharPolicy {
            test_required,
            notify_required,
            replace_with_nothing,
            notifier: None,
        }
    }

    /// Send reports to `notifier` instead of stderr.
    pub fn with_notifier(self, notifier: &'a dyn InvalidCharNotifier) -> Self {
        IncorrectCharPolicy {
            notifier: Some(notifier),
            ..self
        }
    }

    pub(crate) fn notifier(&self) -> &'a dyn InvalidCharNotifier {
        self.notifier.unwrap_or(&STDERR_NOTIFIER)
    }
}

impl Default for IncorrectCharPolicy<'_> {
    fn default() -> Self {
        IncorrectCharPolicy::STRIP_AND_REPORT
    }
}

impl fmt::Debug for IncorrectCharPolicy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncorrectCharPolicy")
            .field("test_required", &self.test_required)
            .field("notify_required", &self.notify_required)
            .field("replace_with_nothing", &self.replace_with_nothing)
            .field("notifier", &self.notifier.map(|_| "custom"))
            .finish()
    }
}
