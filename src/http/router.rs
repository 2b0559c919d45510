use std::collections::HashMap;

use axum::http::Method;

use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
    Glob(String),
    Rest,
}

/// A registered path: literal segments, `:name` parameters (`:name?` when
/// optional), `*` matching the remainder of the path (possibly empty), or a
/// segment glob
/// such as `*.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Self {
        let segments = split_path(path)
            .into_iter()
            .map(|seg| {
                if seg == "*" {
                    Segment::Rest
                } else if is_dynamic_segment(seg) {
                    let name = seg.trim_start_matches(':');
                    match name.strip_suffix('?') {
                        Some(name) => Segment::Param {
                            name: name.to_string(),
                            optional: true,
                        },
                        None => Segment::Param {
                            name: name.to_string(),
                            optional: false,
                        },
                    }
                } else if seg.contains('*') {
                    Segment::Glob(seg.to_string())
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();

        PathPattern {
            raw: path.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the captured parameters when `path` matches.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let segments = split_path(path);
        let mut params = HashMap::new();
        if match_segments(&self.segments, &segments, &mut params) {
            Some(params)
        } else {
            None
        }
    }
}

fn is_dynamic_segment(segment: &str) -> bool {
    segment.starts_with(':') && segment.len() > 1
}

fn split_path(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').skip(1).collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

fn match_segments(
    pattern: &[Segment],
    path: &[&str],
    params: &mut HashMap<String, String>,
) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };

    match head {
        Segment::Rest => (0..=path.len()).any(|taken| {
            let mut attempt = params.clone();
            if match_segments(rest, &path[taken..], &mut attempt) {
                attempt.insert("*".to_string(), path[..taken].join("/"));
                *params = attempt;
                true
            } else {
                false
            }
        }),
        Segment::Param { name, optional } => {
            if let Some((seg, remaining)) = path.split_first() {
                if !seg.is_empty() {
                    let mut attempt = params.clone();
                    attempt.insert(name.clone(), seg.to_string());
                    if match_segments(rest, remaining, &mut attempt) {
                        *params = attempt;
                        return true;
                    }
                }
            }
            *optional && match_segments(rest, path, params)
        }
        Segment::Literal(literal) => match path.split_first() {
            Some((seg, remaining)) if seg.eq_ignore_ascii_case(literal) => {
                match_segments(rest, remaining, params)
            }
            _ => false,
        },
        Segment::Glob(glob) => match path.split_first() {
            Some((seg, remaining)) if glob_matches(glob, seg) => {
                match_segments(rest, remaining, params)
            }
            _ => false,
        },
    }
}

fn glob_matches(glob: &str, text: &str) -> bool {
    let parts: Vec<&str> = glob.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }

    let mut remaining = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    true
}

struct Route {
    pattern: PathPattern,
    resource: Resource,
}

/// Resources in registration order with their compiled paths.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn build(resources: Vec<Resource>) -> Self {
        let routes = resources
            .into_iter()
            .map(|resource| Route {
                pattern: PathPattern::parse(resource.request().path_name()),
                resource,
            })
            .collect();
        RouteTable { routes }
    }

    /// Resources registered for `method` whose path pattern matches, in
    /// registration order.
    pub fn candidates<'a>(
        &'a self,
        method: &'a Method,
        path: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.routes
            .iter()
            .filter(move |route| route.resource.request().method().accepts(method))
            .filter(move |route| route.pattern.matches(path).is_some())
            .map(|route| &route.resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.routes.iter().map(|route| &route.resource)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
