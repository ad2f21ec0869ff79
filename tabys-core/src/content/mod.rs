//! Content browsing
//!
//! Paged, permission-checked reads of the backend's content collections.
//! Listing pages are cached per (identity, collection, page) for a few
//! minutes; single items and statistics always go to the backend.

use crate::cache::TtlCache;
use crate::config::CacheConfig;
use crate::gate::RequestContext;
use crate::gateway::{AdminBackend, ApiError, Method, Page};
use crate::rbac::guard::{require_auth, require_permission, require_role};
use crate::rbac::{Denial, Module, Operation, Role, UnknownName};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const ANALYTICS_PATH: &str = "/api/v2/analytics/";

/// Browsable collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Courses,
    Vacancies,
    News,
    Projects,
    Volunteers,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Events,
        Collection::Courses,
        Collection::Vacancies,
        Collection::News,
        Collection::Projects,
        Collection::Volunteers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Courses => "courses",
            Collection::Vacancies => "vacancies",
            Collection::News => "news",
            Collection::Projects => "projects",
            Collection::Volunteers => "volunteers",
        }
    }

    /// Module whose permissions gate this collection
    pub fn module(&self) -> Module {
        match self {
            Collection::Events => Module::Events,
            Collection::Courses => Module::Courses,
            Collection::Vacancies => Module::Vacancies,
            Collection::News => Module::News,
            Collection::Projects => Module::Projects,
            Collection::Volunteers => Module::Volunteers,
        }
    }

    pub fn list_path(&self) -> &'static str {
        match self {
            Collection::Events => "/api/v2/events/",
            Collection::Courses => "/api/v2/courses/",
            Collection::Vacancies => "/api/v2/vacancies/",
            Collection::News => "/api/v2/news/",
            Collection::Projects => "/api/v2/projects/",
            Collection::Volunteers => "/api/v2/admin/volunteers/",
        }
    }

    /// Path of one item; volunteers have no detail endpoint
    pub fn detail_path(&self, id: i64) -> Option<String> {
        match self {
            Collection::Events => Some(format!("/api/v2/events/{}/", id)),
            Collection::Courses => Some(format!("/api/v2/courses/{}", id)),
            Collection::Vacancies => Some(format!("/api/v2/vacancies/{}", id)),
            Collection::News => Some(format!("/api/v2/news/{}/", id)),
            Collection::Projects => Some(format!("/api/v2/projects/{}", id)),
            Collection::Volunteers => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName { kind: "collection", name: s.to_string() })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error(transparent)]
    Denied(#[from] Denial),

    #[error("{0} has no detail view")]
    NoDetailView(Collection),

    #[error(transparent)]
    Api(#[from] ApiError),
}

type PageKey = (String, Collection, u32);

/// Permission-checked reads of backend collections
#[derive(Clone)]
pub struct ContentService {
    backend: Arc<dyn AdminBackend>,
    pages: Arc<TtlCache<PageKey, Page>>,
    page_size: u32,
}

impl ContentService {
    pub fn new(backend: Arc<dyn AdminBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            pages: Arc::new(TtlCache::new(config.content_ttl())),
            page_size: config.page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// One page of a collection (pages start at 1)
    pub async fn list(
        &self,
        ctx: &RequestContext,
        collection: Collection,
        page: u32,
    ) -> Result<Page, ContentError> {
        require_auth(ctx).into_result()?;
        require_permission(ctx.rbac(), collection.module(), Operation::Read).into_result()?;
        let Some(session) = ctx.session() else {
            return Err(Denial::NotAuthenticated.into());
        };

        let page = page.max(1);
        let key = (session.external_user_id.clone(), collection, page);
        if let Some(cached) = self.pages.get(&key) {
            log::debug!("Cache hit for {} page {} of {}", collection, page, session.external_user_id);
            return Ok(cached);
        }

        let query = [("page", page.to_string()), ("page_size", self.page_size.to_string())];
        let value = self
            .backend
            .authenticated_call(
                Method::GET,
                collection.list_path(),
                &session.access_token,
                None,
                &query,
            )
            .await?;

        let result = Page::from_value(value, page, self.page_size);
        self.pages.insert(key, result.clone());
        Ok(result)
    }

    /// One item of a collection
    pub async fn get(
        &self,
        ctx: &RequestContext,
        collection: Collection,
        id: i64,
    ) -> Result<Value, ContentError> {
        require_auth(ctx).into_result()?;
        require_permission(ctx.rbac(), collection.module(), Operation::Read).into_result()?;
        let Some(session) = ctx.session() else {
            return Err(Denial::NotAuthenticated.into());
        };
        let path = collection.detail_path(id).ok_or(ContentError::NoDetailView(collection))?;

        Ok(self
            .backend
            .authenticated_call(Method::GET, &path, &session.access_token, None, &[])
            .await?)
    }

    /// Dashboard statistics for administrators
    ///
    /// A backend failure yields a placeholder message instead of an error.
    pub async fn dashboard_stats(&self, ctx: &RequestContext) -> Result<Value, ContentError> {
        require_auth(ctx).into_result()?;
        require_role(ctx.rbac(), &[Role::Administrator, Role::SuperAdmin]).into_result()?;
        let Some(session) = ctx.session() else {
            return Err(Denial::NotAuthenticated.into());
        };

        match self
            .backend
            .authenticated_call(Method::GET, ANALYTICS_PATH, &session.access_token, None, &[])
            .await
        {
            Ok(stats) => Ok(stats),
            Err(e) => {
                log::error!("Failed to fetch stats: {}", e);
                Ok(json!({ "message": "Statistics not available" }))
            }
        }
    }

    /// Forget every cached page of one identity
    pub fn invalidate_user(&self, external_user_id: &str) {
        self.pages.retain(|(user, _, _)| user != external_user_id);
    }

    /// Drop expired pages; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        self.pages.purge_expired()
    }
}
