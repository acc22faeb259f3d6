//! Membership resolution: who is entitled to hear about a project.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::logging::{COMPONENT_RESOLVER, SUBSYSTEM_REALTIME};
use crate::models::UserId;
use crate::traits::ProjectDirectory;

/// Set of users an event is addressed to. Computed per emission, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(HashSet<UserId>);

impl Audience {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the acting user so nobody is told about their own change.
    pub fn without(mut self, actor: UserId) -> Self {
        self.0.remove(&actor);
        self
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<UserId> for Audience {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Audience {
    type Item = UserId;
    type IntoIter = std::collections::hash_set::IntoIter<UserId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Computes project audiences (owner plus every member) from the directory.
#[derive(Clone)]
pub struct MembershipResolver {
    directory: Arc<dyn ProjectDirectory>,
}

impl MembershipResolver {
    pub fn new(directory: Arc<dyn ProjectDirectory>) -> Self {
        Self { directory }
    }

    pub async fn audience_for_project(&self, project_id: Uuid) -> Result<Audience> {
        let owner = self
            .directory
            .project_owner(project_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Project {}", project_id)))?;
        let members = self.directory.member_ids(project_id).await?;

        let audience: Audience = std::iter::once(owner).chain(members).collect();
        debug!(
            subsystem = SUBSYSTEM_REALTIME,
            component = COMPONENT_RESOLVER,
            project_id = %project_id,
            audience_size = audience.len(),
            "Resolved project audience"
        );
        Ok(audience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedDirectory {
        owners: HashMap<Uuid, UserId>,
        members: HashMap<Uuid, Vec<UserId>>,
    }

    #[async_trait]
    impl ProjectDirectory for FixedDirectory {
        async fn project_owner(&self, project_id: Uuid) -> Result<Option<UserId>> {
            Ok(self.owners.get(&project_id).copied())
        }

        async fn member_ids(&self, project_id: Uuid) -> Result<Vec<UserId>> {
            Ok(self.members.get(&project_id).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_audience_is_owner_plus_members() {
        let project = Uuid::new_v4();
        let (owner, m1, m2) = (UserId::random(), UserId::random(), UserId::random());
        let resolver = MembershipResolver::new(Arc::new(FixedDirectory {
            owners: HashMap::from([(project, owner)]),
            members: HashMap::from([(project, vec![m1, m2])]),
        }));

        let audience = resolver.audience_for_project(project).await.unwrap();
        assert_eq!(audience.len(), 3);
        assert!(audience.contains(owner));
        assert!(audience.contains(m1));
        assert!(audience.contains(m2));
    }

    #[tokio::test]
    async fn test_owner_listed_as_member_is_deduplicated() {
        let project = Uuid::new_v4();
        let owner = UserId::random();
        let resolver = MembershipResolver::new(Arc::new(FixedDirectory {
            owners: HashMap::from([(project, owner)]),
            members: HashMap::from([(project, vec![owner])]),
        }));

        let audience = resolver.audience_for_project(project).await.unwrap();
        assert_eq!(audience.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let resolver = MembershipResolver::new(Arc::new(FixedDirectory {
            owners: HashMap::new(),
            members: HashMap::new(),
        }));

        let err = resolver
            .audience_for_project(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_without_removes_actor_even_if_member() {
        let (actor, other) = (UserId::random(), UserId::random());
        let audience: Audience = [actor, other].into_iter().collect();

        let audience = audience.without(actor);
        assert!(!audience.contains(actor));
        assert!(audience.contains(other));

        let unchanged = audience.clone().without(UserId::random());
        assert_eq!(unchanged, audience);
    }
}
