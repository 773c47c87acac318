//! Link store operations: create, read, update, delete
//!
//! Code assignment is delegated to the code generator when no custom alias
//! is given. Mutations are owner-scoped; redirect reads go through
//! [`crate::redirect`] and are owner-agnostic.

use std::sync::Arc;

use crate::clock::Clock;
use crate::codegen;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Link, LinkFilter, LinkUpdate, NewLink};
use crate::storage::Storage;

const MAX_TARGET_URL_BYTES: usize = 2048;

pub struct LinkService {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    code_length: usize,
}

impl LinkService {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, code_length: usize) -> Self {
        Self {
            storage,
            clock,
            code_length,
        }
    }

    /// Create a link, generating a code unless a custom alias is given.
    /// The alias path runs the same uniqueness check as generation, plus
    /// format validation and the reserved-word blocklist.
    pub async fn create(
        &self,
        owner: &str,
        target_url: &str,
        custom_alias: Option<&str>,
        is_public: bool,
        expires_at: Option<i64>,
    ) -> ServiceResult<Link> {
        validate_target_url(target_url)?;

        let code = match custom_alias {
            Some(alias) => {
                codegen::validate_alias(alias)?;
                if self.storage.code_exists(alias).await? {
                    return Err(ServiceError::Conflict);
                }
                alias.to_string()
            }
            None => codegen::generate_code(self.storage.as_ref(), self.code_length).await?,
        };

        let link = self
            .storage
            .create_link(&NewLink {
                owner: owner.to_string(),
                target_url: target_url.to_string(),
                code,
                is_public,
                expires_at,
                created_at: self.clock.now_ts(),
            })
            .await?;

        Ok(link)
    }

    /// Owner-scoped read. A code belonging to someone else reports
    /// `NotFound` rather than leaking its existence.
    pub async fn get_owned(&self, code: &str, owner: &str) -> ServiceResult<Link> {
        match self.storage.get_link_by_code(code).await? {
            Some(link) if link.owner == owner => Ok(link),
            _ => Err(ServiceError::NotFound),
        }
    }

    pub async fn list(
        &self,
        owner: &str,
        filter: LinkFilter,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Link>> {
        let links = self
            .storage
            .list_links(owner, filter, search, self.clock.now_ts(), limit, offset)
            .await?;
        Ok(links)
    }

    /// Update target/active/expiry/visibility. The code itself is
    /// immutable.
    pub async fn update(
        &self,
        code: &str,
        owner: &str,
        changes: &LinkUpdate,
    ) -> ServiceResult<Link> {
        if let Some(ref target_url) = changes.target_url {
            validate_target_url(target_url)?;
        }
        if changes.is_empty() {
            return self.get_owned(code, owner).await;
        }

        self.storage
            .update_link(code, owner, changes, self.clock.now_ts())
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Delete a link and its click history; the code becomes available
    /// for reuse.
    pub async fn delete(&self, code: &str, owner: &str) -> ServiceResult<()> {
        if self.storage.delete_link(code, owner).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }
}

/// Targets must be absolute http(s) URLs with a host, bounded in length.
fn validate_target_url(target_url: &str) -> ServiceResult<()> {
    if target_url.is_empty() {
        return Err(ServiceError::Validation("target URL cannot be empty".to_string()));
    }
    if target_url.len() > MAX_TARGET_URL_BYTES {
        return Err(ServiceError::Validation(format!(
            "target URL exceeds {MAX_TARGET_URL_BYTES} bytes"
        )));
    }

    let parsed = url::Url::parse(target_url)
        .map_err(|_| ServiceError::Validation("target URL is not a valid absolute URL".to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServiceError::Validation(
            "target URL must use http or https".to_string(),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(ServiceError::Validation("target URL must have a host".to_string()));
    }

    Ok(())
}
