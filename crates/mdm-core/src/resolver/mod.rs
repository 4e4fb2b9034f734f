//! Turns raw hoster links into direct download URLs via unlock services.
//!
//! The scheduler only depends on [`MirrorResolver`]; [`LinkResolver`] is the
//! production implementation that picks a service per hoster and falls back
//! to the other service when the first one cannot unlock the link.

mod route;
mod service;

pub use route::{RouteTable, DEFAULT_HOSTER_ROUTES};
pub use service::{
    ServiceEndpoint, UnlockError, UnlockService, Unlocked, DEBRIDLINK_ADD_URL,
    REALDEBRID_UNRESTRICT_URL,
};

use crate::config::ResolverConfig;
use service::truncate;
use std::time::Duration;

/// Resolves one raw mirror link. `None` means every configured service failed.
pub trait MirrorResolver: Send + Sync {
    fn resolve(&self, link: &str) -> Option<Unlocked>;
}

/// Service selection with single fallback.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    routes: RouteTable,
    realdebrid: ServiceEndpoint,
    debridlink: ServiceEndpoint,
}

impl LinkResolver {
    pub fn new(routes: RouteTable, realdebrid: ServiceEndpoint, debridlink: ServiceEndpoint) -> Self {
        Self {
            routes,
            realdebrid,
            debridlink,
        }
    }

    pub fn from_config(cfg: &ResolverConfig) -> Self {
        let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
        Self::new(
            RouteTable::new(&cfg.hoster_routes, cfg.preferred_service),
            ServiceEndpoint {
                service: UnlockService::RealDebrid,
                url: cfg.realdebrid_url.clone(),
                token: cfg.realdebrid_token.clone(),
                timeout,
            },
            ServiceEndpoint {
                service: UnlockService::DebridLink,
                url: cfg.debridlink_url.clone(),
                token: cfg.debridlink_token.clone(),
                timeout,
            },
        )
    }

    fn endpoint(&self, service: UnlockService) -> &ServiceEndpoint {
        match service {
            UnlockService::RealDebrid => &self.realdebrid,
            UnlockService::DebridLink => &self.debridlink,
        }
    }

    pub fn preferred_service(&self, link: &str) -> UnlockService {
        self.routes.preferred(link)
    }

    /// Tries the preferred service, then the other one if it has credentials.
    pub fn resolve(&self, link: &str) -> Option<Unlocked> {
        let first = self.preferred_service(link);
        if let Some(unlocked) = self.try_service(first, link) {
            return Some(unlocked);
        }

        let second = first.other();
        if !self.endpoint(second).has_token() {
            return None;
        }
        tracing::info!(link = %truncate(link, 60), "{first} failed, falling back to {second}");
        self.try_service(second, link)
    }

    fn try_service(&self, service: UnlockService, link: &str) -> Option<Unlocked> {
        match self.endpoint(service).unlock(link) {
            Ok(unlocked) => {
                tracing::debug!(
                    service = service.label(),
                    file = %unlocked.filename,
                    "unlocked {}",
                    truncate(link, 60)
                );
                Some(unlocked)
            }
            Err(UnlockError::MissingToken(_)) => {
                tracing::debug!(service = service.label(), "skipping service without token");
                None
            }
            Err(e) => {
                tracing::warn!(
                    service = service.label(),
                    link = %truncate(link, 60),
                    "unlock failed: {e}"
                );
                None
            }
        }
    }
}

impl MirrorResolver for LinkResolver {
    fn resolve(&self, link: &str) -> Option<Unlocked> {
        LinkResolver::resolve(self, link)
    }
}
