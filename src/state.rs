use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    paguelofacil::PagueloFacilClient,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: AppConfig,
    pub payments: PagueloFacilClient,
}
