use crate::{api::attendance, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Context, Result};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP budgets, shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    read: Limiter,
    scan: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            read: Arc::new(build_limiter(config.rate_read_per_min).context("read limiter")?),
            scan: Arc::new(build_limiter(config.rate_scan_per_min).context("scan limiter")?),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limit")?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    cfg.service(
        web::scope(&config.api_prefix).service(
            web::scope("/attendance")
                // /attendance
                .service(
                    web::resource("")
                        .wrap(limiters.read.clone())
                        .route(web::get().to(attendance::list_attendance)),
                )
                // /attendance/scan
                .service(
                    web::resource("/scan")
                        .wrap(limiters.scan.clone())
                        .route(web::post().to(attendance::scan)),
                )
                // /attendance/scanner/simulate
                .service(
                    web::resource("/scanner/simulate")
                        .wrap(limiters.scan.clone())
                        .route(web::post().to(attendance::simulate_scan)),
                ),
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiters_build_from_defaults() {
        assert!(Limiters::from_config(&Config::for_tests()).is_ok());
    }

    #[test]
    fn zero_budget_still_builds() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
