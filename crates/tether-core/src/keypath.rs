use std::fmt::{self, Display};

///
/// PathSegment
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        Self::Field(s)
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(s) | Self::Key(s) => f.write_str(s),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

///
/// Keypath
///
/// Absolute path from the root object of a call to a value.
/// Renders dotted for fields, dict keys and list indexes alike
/// (`posts.0.comments.3.text`); the root renders as the empty string.
///

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Keypath {
    segments: Vec<PathSegment>,
}

impl Keypath {
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Return a new keypath extended by one segment.
    #[must_use]
    pub fn child(&self, seg: impl Into<PathSegment>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(seg.into());

        Self { segments }
    }

    /// Prepend `prefix` to this keypath.
    #[must_use]
    pub fn under(&self, prefix: &Self) -> Self {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());

        Self { segments }
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }

        Ok(())
    }
}

impl From<&str> for Keypath {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }

        Self {
            segments: s
                .split('.')
                .map(|part| {
                    part.parse::<usize>()
                        .map_or_else(|_| PathSegment::from(part), PathSegment::Index)
                })
                .collect(),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fields_and_indexes_dotted() {
        let path = Keypath::field("posts")
            .child(0)
            .child("comments")
            .child(PathSegment::Key("en".into()));

        assert_eq!(path.render(), "posts.0.comments.en");
    }

    #[test]
    fn root_renders_empty() {
        assert_eq!(Keypath::root().render(), "");
        assert!(Keypath::from("").is_root());
    }

    #[test]
    fn under_prepends_prefix() {
        let nested = Keypath::field("title");
        let prefix = Keypath::field("posts").child(2);

        assert_eq!(nested.under(&prefix).render(), "posts.2.title");
    }

    #[test]
    fn parses_rendered_form() {
        let path = Keypath::from("numbers.4");

        assert_eq!(
            path.segments(),
            &[PathSegment::Field("numbers".into()), PathSegment::Index(4)]
        );
    }
}
