//! Read-only community views: tanks, equipment lending, marketplace, stats.

use crate::models::{
    EquipmentDetail, EquipmentListResponse, MarketResponse, StatsResponse, TankResponse,
    TanksResponse,
};
use crate::query::{QueryObserver, QueryOptions};
use crate::query_key;
use crate::resource::Resource;
use crate::service::BarcodeClient;

pub fn tanks() -> Resource<TanksResponse> {
    Resource::new(query_key!["tanks"], "tank")
}

pub fn tank(tank_id: u64) -> Resource<TankResponse> {
    Resource::new(query_key!["tank", tank_id], format!("tank/{}", tank_id))
}

pub fn equipment() -> Resource<EquipmentListResponse> {
    Resource::new(query_key!["equipment"], "equipment")
}

pub fn equipment_item(item_id: u64) -> Resource<EquipmentDetail> {
    Resource::new(
        query_key!["equipment", item_id],
        format!("equipment/{}", item_id),
    )
}

pub fn marketplace() -> Resource<MarketResponse> {
    Resource::new(query_key!["marketplace"], "market")
}

pub fn stats() -> Resource<StatsResponse> {
    Resource::new(query_key!["stats"], "public/stats")
}

impl BarcodeClient {
    pub fn tanks(&self) -> QueryObserver<TanksResponse> {
        self.observe(tanks(), QueryOptions::default())
    }

    pub fn tank(&self, tank_id: u64) -> QueryObserver<TankResponse> {
        self.observe(tank(tank_id), QueryOptions::default())
    }

    pub fn equipment(&self) -> QueryObserver<EquipmentListResponse> {
        self.observe(equipment(), QueryOptions::default())
    }

    /// One lending item and its waiting queue.
    pub fn equipment_item(&self, item_id: u64) -> QueryObserver<EquipmentDetail> {
        self.observe(equipment_item(item_id), QueryOptions::default())
    }

    pub fn marketplace(&self) -> QueryObserver<MarketResponse> {
        self.observe(marketplace(), QueryOptions::default())
    }

    /// Public platform statistics; needs no session.
    pub fn stats(&self) -> QueryObserver<StatsResponse> {
        self.observe(stats(), QueryOptions::default())
    }
}
