use core::fmt;

// -----------------------------------------------------------------------------
// PathStack

/// Tracks the position inside a document as a stack of container frames and
/// renders it in dot/bracket notation, e.g. `items[2].name`.
///
/// Both the reader and the writer keep one of these so every fault can name
/// the node it concerns. The root renders as an empty string.
#[derive(Debug, Default)]
pub struct PathStack {
    frames: Vec<Frame>,
}

#[derive(Debug)]
enum Frame {
    Object { current: Option<String> },
    Array { index: Option<usize> },
    Constructor { name: String, index: Option<usize> },
}

impl PathStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_object(&mut self) {
        self.frames.push(Frame::Object { current: None });
    }

    pub fn push_array(&mut self) {
        self.frames.push(Frame::Array { index: None });
    }

    pub fn push_constructor(&mut self, name: &str) {
        self.frames.push(Frame::Constructor {
            name: name.to_owned(),
            index: None,
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Records the member name about to be visited in the innermost object.
    pub fn set_property(&mut self, name: &str) {
        if let Some(Frame::Object { current }) = self.frames.last_mut() {
            *current = Some(name.to_owned());
        }
    }

    /// Advances the element index of the innermost array or constructor.
    pub fn advance_item(&mut self) {
        match self.frames.last_mut() {
            Some(Frame::Array { index }) | Some(Frame::Constructor { index, .. }) => {
                *index = Some(index.map_or(0, |i| i + 1));
            }
            _ => {}
        }
    }

    /// Renders the current path. Members are joined with `.`, indices use
    /// `[n]`, and member names containing `.` are bracket-quoted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for frame in &self.frames {
            match frame {
                Frame::Object { current } => {
                    if let Some(name) = current {
                        if name.contains('.') {
                            out.push_str(&format!("['{name}']"));
                        } else {
                            if !out.is_empty() {
                                out.push('.');
                            }
                            out.push_str(name);
                        }
                    }
                }
                Frame::Array { index } | Frame::Constructor { index, .. } => {
                    if let Some(i) = index {
                        out.push_str(&format!("[{i}]"));
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for PathStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_members_and_indices() {
        let mut path = PathStack::new();
        assert_eq!(path.render(), "");

        path.push_object();
        path.set_property("items");
        path.push_array();
        path.advance_item();
        path.advance_item();
        path.advance_item();
        path.push_object();
        path.set_property("name");
        assert_eq!(path.render(), "items[2].name");

        path.pop();
        path.pop();
        assert_eq!(path.render(), "items");
    }

    #[test]
    fn dotted_member_names_are_quoted() {
        let mut path = PathStack::new();
        path.push_object();
        path.set_property("a.b");
        assert_eq!(path.render(), "['a.b']");
    }

    #[test]
    fn array_before_first_item_renders_bare() {
        let mut path = PathStack::new();
        path.push_array();
        assert_eq!(path.render(), "");
        path.advance_item();
        assert_eq!(path.render(), "[0]");
    }
}
