/// An element that has been opened but not yet closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Local name, without prefix.
    pub name: String,
    /// Whether the element belongs to the METS vocabulary.
    pub is_mets: bool,
    pub attrs: Vec<(String, String)>,
    /// Index of the division this frame opened, within the innermost open map.
    pub division: Option<usize>,
}

impl Frame {
    pub fn new(name: impl Into<String>, is_mets: bool, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            is_mets,
            attrs,
            division: None,
        }
    }

    /// Attribute value by local name. The first occurrence wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is(&self, name: &str) -> bool {
        self.is_mets && self.name == name
    }
}

/// True when the innermost frames of `stack` are, innermost first, the METS
/// elements named by `pattern`.
pub fn matches_ancestry(stack: &[Frame], pattern: &[&str]) -> bool {
    stack.len() >= pattern.len()
        && stack
            .iter()
            .rev()
            .zip(pattern)
            .all(|(frame, name)| frame.is(name))
}

/// True when some frame of `stack` is the METS element `name`.
pub fn has_ancestor(stack: &[Frame], name: &str) -> bool {
    stack.iter().any(|frame| frame.is(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(names: &[&str]) -> Vec<Frame> {
        names
            .iter()
            .map(|name| Frame::new(*name, true, Vec::new()))
            .collect()
    }

    #[test]
    fn test_matches_innermost_first() {
        let frames = stack(&["mets", "fileSec", "fileGrp", "file", "FLocat"]);
        assert!(matches_ancestry(&frames, &["FLocat", "file", "fileGrp", "fileSec"]));
        assert!(matches_ancestry(&frames, &["FLocat"]));
        assert!(!matches_ancestry(&frames, &["file", "fileGrp", "fileSec"]));
    }

    #[test]
    fn test_nested_group_breaks_the_chain() {
        let frames = stack(&["mets", "fileSec", "fileGrp", "fileGrp", "file", "FLocat"]);
        assert!(!matches_ancestry(&frames, &["FLocat", "file", "fileGrp", "fileSec"]));
    }

    #[test]
    fn test_pattern_longer_than_stack() {
        let frames = stack(&["file", "FLocat"]);
        assert!(!matches_ancestry(&frames, &["FLocat", "file", "fileGrp"]));
    }

    #[test]
    fn test_foreign_frames_never_match() {
        let mut frames = stack(&["fileSec", "fileGrp", "file"]);
        frames.push(Frame::new("FLocat", false, Vec::new()));
        assert!(!matches_ancestry(&frames, &["FLocat", "file", "fileGrp", "fileSec"]));
    }

    #[test]
    fn test_attr_lookup() {
        let frame = Frame::new(
            "file",
            true,
            vec![
                ("ID".to_string(), "f1".to_string()),
                ("ID".to_string(), "f2".to_string()),
            ],
        );
        assert_eq!(frame.attr("ID"), Some("f1"));
        assert_eq!(frame.attr("USE"), None);
        assert!(has_ancestor(&[frame], "file"));
    }
}
