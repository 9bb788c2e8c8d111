//! Second pass: link every recorded use to its declaration.

use crate::model::ReferenceLocation;
use crate::model::SymbolHandle;
use crate::store::IndexStore;
use codescope_symbol_extractor::Location;
use codescope_symbol_extractor::Use;
use codescope_symbol_extractor::UseTarget;
use log::debug;
use log::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolved: usize,
    pub dropped: usize,
}

/// Resolves every use in `store`, attaching references to their targets.
///
/// Needs the complete symbol table, so it runs only after extraction has
/// finished for the whole file set.
pub fn resolve_all(store: &mut IndexStore) -> ResolveStats {
    let mut stats = ResolveStats::default();

    let uses: Vec<Use> = store
        .entries()
        .flat_map(|entry| entry.uses.iter().cloned())
        .collect();

    for site in uses {
        let Some(handle) = resolve_use(store, &site) else {
            stats.dropped += 1;
            continue;
        };
        let Ok(symbol) = store.symbol(&handle) else {
            stats.dropped += 1;
            continue;
        };
        // A declaration's own name is not a use of it.
        if symbol.path == site.file && symbol.selection_range == site.range {
            stats.dropped += 1;
            continue;
        }
        let location = ReferenceLocation {
            path: site.file,
            range: site.range,
            symbol: symbol.id(),
        };
        match store.attach_reference(&handle, location) {
            Ok(()) => stats.resolved += 1,
            Err(err) => {
                warn!("Failed to attach reference: {err}");
                stats.dropped += 1;
            }
        }
    }

    debug!(
        "Resolved {} uses, dropped {}",
        stats.resolved, stats.dropped
    );
    stats
}

/// Finds the declaration a use points at, if it is in the index.
pub fn resolve_use(store: &IndexStore, site: &Use) -> Option<SymbolHandle> {
    match &site.target {
        UseTarget::Declaration(location) => resolve_location(store, location),
        UseTarget::Name(name) => resolve_name(store, site, name),
    }
}

fn resolve_location(store: &IndexStore, location: &Location) -> Option<SymbolHandle> {
    // Out-of-tree declarations (std, dependencies) have no entry.
    let entry = store.entry(&location.path)?;
    let slot = entry
        .symbols
        .iter()
        .position(|symbol| symbol.declared_at(location.range.start))?;
    Some(store.handle(&location.path, slot))
}

fn resolve_name(store: &IndexStore, site: &Use, name: &str) -> Option<SymbolHandle> {
    let candidates = store.handles_named(name);
    if let Some(local) = candidates.iter().find(|handle| handle.path == site.file) {
        return Some(local.clone());
    }
    match candidates.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        many => {
            debug!(
                "Ambiguous use of `{name}` at {}:{}: {} candidates",
                site.file.display(),
                site.range.start,
                many.len()
            );
            None
        }
    }
}
