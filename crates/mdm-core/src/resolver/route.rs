//! Hoster domain → preferred unlock service routing.

use super::UnlockService;
use crate::url_model::HostTable;
use std::collections::BTreeMap;

use UnlockService::{DebridLink as DL, RealDebrid as RD};

/// Built-in routing, by which service supports a hoster best.
pub const DEFAULT_HOSTER_ROUTES: &[(&str, UnlockService)] = &[
    ("1fichier", RD),
    ("4shared", RD),
    ("brupload", RD),
    ("clicknupload", RD),
    ("dailymotion", RD),
    ("dailyuploads", RD),
    ("ddl.to", RD),
    ("dropbox", RD),
    ("filefactory", RD),
    ("filespace", RD),
    ("filestore", RD),
    ("filextras", RD),
    ("gigapeta", RD),
    ("drive", RD),
    ("google", RD),
    ("hexupload", RD),
    ("hexload", RD),
    ("hitfile", RD),
    ("icloud", RD),
    ("isra.cloud", RD),
    ("katfile", RD),
    ("mediafire", RD),
    ("mega", RD),
    ("prefiles", RD),
    ("rapidgator", RD),
    ("scribd", RD),
    ("send.cm", RD),
    ("send.now", RD),
    ("sendspace", RD),
    ("terabytez", RD),
    ("turbobit", RD),
    ("uploady", RD),
    ("vimeo", RD),
    ("voe", RD),
    ("ddownload", DL),
    ("file.al", DL),
    ("drop.download", DL),
    ("elitefile", DL),
    ("emload", DL),
    ("fikper", DL),
    ("filecat", DL),
    ("filedot", DL),
    ("fileland", DL),
    ("filer.net", DL),
    ("gofile", DL),
    ("hulkshare", DL),
    ("kshared", DL),
    ("mixdrop", DL),
    ("nelion", DL),
    ("pixeldrain", DL),
    ("silkfiles", DL),
    ("terabox", DL),
    ("tezfiles", DL),
];

/// Precomputed route lookup. Configured routes shadow the built-in ones.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HostTable<UnlockService>,
    default_service: UnlockService,
}

impl RouteTable {
    pub fn new(overrides: &BTreeMap<String, UnlockService>, default_service: UnlockService) -> Self {
        let mut routes = HostTable::new();
        for (domain, service) in overrides {
            routes.insert(domain, *service);
        }
        for (domain, service) in DEFAULT_HOSTER_ROUTES {
            routes.insert(domain, *service);
        }
        Self {
            routes,
            default_service,
        }
    }

    pub fn preferred(&self, link: &str) -> UnlockService {
        self.routes
            .get(link)
            .copied()
            .unwrap_or(self.default_service)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(&BTreeMap::new(), UnlockService::default())
    }
}
