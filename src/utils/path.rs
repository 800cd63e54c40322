use crate::RemoteError;
use crate::Result;

/// Join segments into a cleaned absolute node path.
///
/// Segments may carry their own slashes; empty and `.` components are
/// dropped and `..` removes the previous component, never climbing above `/`.
pub fn join(parts: &[&str]) -> String {
    let mut components: Vec<&str> = Vec::new();
    for part in parts {
        for c in part.split('/') {
            match c {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                c => components.push(c),
            }
        }
    }

    if components.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for c in components {
        out.push('/');
        out.push_str(c);
    }
    out
}

/// Parent of an absolute path; `None` for the root.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// Reject paths the coordination service would refuse.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(RemoteError::BadArguments(format!("path must be absolute: {:?}", path)).into());
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(RemoteError::BadArguments(format!("path must not end with '/': {:?}", path)).into());
    }
    for c in path[1..].split('/') {
        if c.is_empty() || c == "." || c == ".." || c.contains('\0') {
            return Err(RemoteError::BadArguments(format!("invalid path component in {:?}", path)).into());
        }
    }
    Ok(())
}

/// Reject names that would not stay a single node below their parent.
pub fn validate_segment(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(RemoteError::BadArguments(format!("invalid node name {:?}", name)).into());
    }
    Ok(())
}
