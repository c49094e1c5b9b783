//! Per-mother frag resources: lineage, kids, fans, sharing and problem reports.
//!
//! Lineage, kids and fans are gated: views enable them once the detail panel
//! is expanded.

use crate::error::Error;
use crate::http::RequestBody;
use crate::key::QueryKey;
use crate::models::{
    CollectionResponse, FanResponse, FragDetail, FragKidsResponse, FragTreeResponse, OopsReport,
    ShareResponse,
};
use crate::mutation::Mutation;
use crate::query::{QueryObserver, QueryOptions};
use crate::query_key;
use crate::resource::Resource;
use crate::service::BarcodeClient;
use reqwest::Method;

use super::collection::collection_key;

pub fn fans_key(mother_id: u64) -> QueryKey {
    query_key!["frag", "fans", mother_id]
}

pub fn frag_key(frag_id: u64) -> QueryKey {
    query_key!["frag", frag_id]
}

pub fn lineage(mother_id: u64) -> Resource<FragTreeResponse> {
    Resource::new(
        query_key!["frag", "lineage", mother_id],
        format!("dbtc/tree/{}", mother_id),
    )
}

pub fn kids(mother_id: u64) -> Resource<FragKidsResponse> {
    Resource::new(
        query_key!["frag", "kids", mother_id],
        format!("dbtc/kids/{}", mother_id),
    )
}

pub fn fans(mother_id: u64) -> Resource<FanResponse> {
    Resource::new(fans_key(mother_id), format!("dbtc/fan/{}", mother_id))
}

impl BarcodeClient {
    /// Ancestry tree of a mother specimen.
    pub fn frag_lineage(&self, mother_id: u64, enabled: bool) -> QueryObserver<FragTreeResponse> {
        self.observe(lineage(mother_id), QueryOptions::default().enabled(enabled))
    }

    /// Descendants of a mother specimen.
    pub fn frag_kids(&self, mother_id: u64, enabled: bool) -> QueryObserver<FragKidsResponse> {
        self.observe(kids(mother_id), QueryOptions::default().enabled(enabled))
    }

    /// Members queued for a frag of this mother.
    pub fn frag_fans(&self, mother_id: u64, enabled: bool) -> QueryObserver<FanResponse> {
        self.observe(fans(mother_id), QueryOptions::default().enabled(enabled))
    }

    /// One frag from the signed-in member's collection.
    ///
    /// There is no single-frag endpoint, so this reads the collection and
    /// picks the frag out; a missing id is `Error::NotFound`.
    pub fn frag_detail(&self, frag_id: u64, enabled: bool) -> QueryObserver<FragDetail> {
        let api = self.api().clone();
        self.queries().observe(
            frag_key(frag_id),
            move || {
                let api = api.clone();
                async move {
                    let collection: CollectionResponse = api.get_json("dbtc/your-collection").await?;
                    let CollectionResponse { user, frags } = collection;
                    frags
                        .into_iter()
                        .find(|f| f.frag_id == frag_id)
                        .map(|frag| FragDetail { frag, user })
                        .ok_or_else(|| Error::NotFound(format!("frag {}", frag_id)))
                }
            },
            QueryOptions::default().enabled(enabled),
        )
    }

    /// Join the request queue for `motherId`.
    pub fn become_fan(&self) -> Mutation<u64, FanResponse> {
        self.fan_mutation("become-fan", Method::PUT)
    }

    /// Leave the request queue for `motherId`.
    pub fn remove_fan(&self) -> Mutation<u64, FanResponse> {
        self.fan_mutation("remove-fan", Method::DELETE)
    }

    fn fan_mutation(&self, name: &'static str, method: Method) -> Mutation<u64, FanResponse> {
        let api = self.api().clone();
        Mutation::new(self.queries(), name, move |mother_id: u64| {
            let api = api.clone();
            let method = method.clone();
            async move {
                let url = api.url(&format!("dbtc/fan/{}", mother_id))?;
                api.send_json::<FanResponse>(method, url, RequestBody::Empty).await
            }
        })
        .invalidates(|mother_id| vec![fans_key(*mother_id), collection_key()])
    }

    /// One-time shareable link for a frag. Nothing is cached.
    pub fn share_frag(&self) -> Mutation<u64, ShareResponse> {
        let api = self.api().clone();
        Mutation::new(self.queries(), "share-frag", move |frag_id: u64| {
            let api = api.clone();
            async move { api.get_json::<ShareResponse>(&format!("dbtc/share/{}", frag_id)).await }
        })
    }

    /// Free-text problem report, posted as multipart.
    pub fn report_oops(&self) -> Mutation<OopsReport, ()> {
        let api = self.api().clone();
        Mutation::new(self.queries(), "report-oops", move |report: OopsReport| {
            let api = api.clone();
            async move {
                let form = reqwest::multipart::Form::new().text("notes", report.notes);
                let url = api.url(&format!("dbtc/oops/{}", report.frag_id))?;
                api.send_unit(Method::POST, url, RequestBody::Multipart(form)).await
            }
        })
    }
}
