//! Field-wise conflict resolution between a local and a remote task.
//!
//! `merge(local, remote)` is total (never errors, see `SyncError`'s lack of a
//! `MergeError` variant), deterministic, and idempotent:
//! `merge(merge(l, r), r) == merge(l, r)`.

use crate::proxy::TaskProxy;

/// Merges `remote` into `local` in place.
pub fn merge(local: &mut TaskProxy, remote: &TaskProxy) {
    let remote_is_newer = remote.last_modified >= local.last_modified;

    if remote_is_newer {
        local.name = remote.name.clone();
        local.due = remote.due;
        local.priority = remote.priority;
        local.reminder_seconds = remote.reminder_seconds;
    }

    // Completion and deletion: prefer the `true` side, regardless of recency.
    local.completed = local.completed || remote.completed;
    if local.completed {
        local.completion_date = match (local.completion_date, remote.completion_date) {
            (Some(l), Some(r)) => Some(l.max(r)),
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (None, None) => None,
        };
    }
    local.is_deleted = local.is_deleted || remote.is_deleted;

    // Notes: prefer the longer non-empty value over the LWW timestamp.
    local.notes = pick_longer_nonempty(&local.notes, &remote.notes);

    // Tags: case-insensitive union.
    local.tags = union_tags(&local.tags, &remote.tags);

    local.last_modified = local.last_modified.max(remote.last_modified);
}

fn pick_longer_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (true, false) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => {
            if b.len() > a.len() {
                b.to_string()
            } else {
                a.to_string()
            }
        }
    }
}

fn union_tags(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for name in a.iter().chain(b.iter()) {
        let key = name.to_lowercase();
        if seen.insert(key) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProviderId;

    fn proxy(name: &str, notes: &str) -> TaskProxy {
        let mut p = TaskProxy::placeholder(ProviderId(1));
        p.name = name.to_string();
        p.notes = notes.to_string();
        p
    }

    #[test]
    fn merge_is_idempotent() {
        let mut local = proxy("Taxes", "filed");
        let remote = proxy("Taxes", "filed in full, with receipts");
        merge(&mut local, &remote);
        let once = local.clone();
        merge(&mut local, &remote);
        assert_eq!(once, local);
    }

    #[test]
    fn notes_prefers_longer_nonempty() {
        let mut local = proxy("Taxes", "filed");
        let remote = proxy("Taxes", "filed 2024");
        merge(&mut local, &remote);
        assert_eq!(local.notes, "filed 2024");
    }

    #[test]
    fn completion_prefers_true_side() {
        let mut local = proxy("Gym", "");
        local.completed = false;
        let mut remote = proxy("Gym", "");
        remote.completed = true;
        merge(&mut local, &remote);
        assert!(local.completed);
    }

    #[test]
    fn tags_union_is_case_insensitive() {
        let mut local = proxy("T", "");
        local.tags = vec!["Home".to_string()];
        let mut remote = proxy("T", "");
        remote.tags = vec!["home".to_string(), "Errands".to_string()];
        merge(&mut local, &remote);
        assert_eq!(local.tags.len(), 2);
    }
}
