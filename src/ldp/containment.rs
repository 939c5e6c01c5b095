use anyhow::Result;
use tracing::debug;

use super::vocab::LDP_CONTAINS;
use super::{Document, Membership, fetch_document, store_document};
use crate::rdf::{Term, Triple};
use crate::store::{Storage, same_resource};

/// Records `member` in `container`: an `ldp:contains` triple, plus the
/// membership triple when the container is a DirectContainer.
pub(crate) async fn add_to_container(
    store: &dyn Storage,
    mut container: Document,
    member: &str,
) -> Result<()> {
    let uri = container.uri.clone();
    container
        .triples
        .push(Triple::new(&uri, LDP_CONTAINS, Term::iri(member)));
    if let Some(membership) = container.membership() {
        let triple = membership.triple(member);
        if same_resource(&membership.resource, &uri) {
            container.triples.push(triple);
        } else {
            let mut resource = fetch_document(store, &membership.resource)
                .await?
                .unwrap_or_else(|| Document::new(&membership.resource, vec![]));
            resource.triples.push(triple);
            store_document(store, &resource).await?;
        }
    }
    debug!(target: "ldp", container = %uri, member, "added member");
    store_document(store, &container).await
}

/// Reverses [`add_to_container`]. Triples already gone are ignored.
pub(crate) async fn remove_from_container(
    store: &dyn Storage,
    mut container: Document,
    member: &str,
) -> Result<()> {
    remove_first(&mut container.triples, |t| {
        t.predicate == LDP_CONTAINS && t.object.as_iri().is_some_and(|o| same_resource(o, member))
    });
    if let Some(membership) = container.membership() {
        remove_membership(store, &mut container, &membership, member).await?;
    }
    debug!(target: "ldp", container = %container.uri, member, "removed member");
    store_document(store, &container).await
}

async fn remove_membership(
    store: &dyn Storage,
    container: &mut Document,
    membership: &Membership,
    member: &str,
) -> Result<()> {
    if same_resource(&membership.resource, &container.uri) {
        remove_first(&mut container.triples, |t| membership.matches(t, member));
        return Ok(());
    }
    let Some(mut resource) = fetch_document(store, &membership.resource).await? else {
        return Ok(());
    };
    if remove_first(&mut resource.triples, |t| membership.matches(t, member)) {
        store_document(store, &resource).await?;
    }
    Ok(())
}

fn remove_first(triples: &mut Vec<Triple>, matches: impl Fn(&Triple) -> bool) -> bool {
    match triples.iter().position(matches) {
        Some(index) => {
            triples.remove(index);
            true
        }
        None => false,
    }
}
