//! Current identity, impersonation and member directory.

use crate::http::RequestBody;
use crate::key::QueryKey;
use crate::models::{ImpersonateResponse, MemberProfile, MembersResponse};
use crate::mutation::Mutation;
use crate::query::{QueryObserver, QueryOptions};
use crate::query_key;
use crate::resource::Resource;
use crate::service::BarcodeClient;
use reqwest::Method;

pub fn user_key() -> QueryKey {
    query_key!["user"]
}

/// Identity plus the admin impersonation flags.
pub fn user() -> Resource<ImpersonateResponse> {
    Resource::new(user_key(), "impersonate")
}

pub fn member(user_id: u64) -> Resource<MemberProfile> {
    Resource::new(query_key!["member", user_id], format!("user/{}", user_id))
}

pub fn members() -> Resource<MembersResponse> {
    Resource::new(query_key!["members"], "user/members")
}

impl BarcodeClient {
    pub fn user(&self) -> QueryObserver<ImpersonateResponse> {
        self.observe(user(), QueryOptions::default())
    }

    pub fn member(&self, user_id: u64) -> QueryObserver<MemberProfile> {
        self.observe(member(user_id), QueryOptions::default())
    }

    pub fn members(&self) -> QueryObserver<MembersResponse> {
        self.observe(members(), QueryOptions::default())
    }

    /// `PUT /impersonate/:userId`, then invalidate `["user"]`.
    pub fn impersonate_start(&self) -> Mutation<u64, ()> {
        let api = self.api().clone();
        Mutation::new(self.queries(), "impersonate-start", move |user_id: u64| {
            let api = api.clone();
            async move {
                let url = api.url(&format!("impersonate/{}", user_id))?;
                api.send_unit(Method::PUT, url, RequestBody::Empty).await
            }
        })
        .invalidates(|_| vec![user_key()])
    }

    /// `DELETE /impersonate`, then invalidate `["user"]`.
    pub fn impersonate_stop(&self) -> Mutation<(), ()> {
        let api = self.api().clone();
        Mutation::new(self.queries(), "impersonate-stop", move |_: ()| {
            let api = api.clone();
            async move {
                let url = api.url("impersonate")?;
                api.send_unit(Method::DELETE, url, RequestBody::Empty).await
            }
        })
        .invalidates(|_| vec![user_key()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors() {
        assert_eq!(user().key(), &query_key!["user"]);
        assert_eq!(user().path(), "impersonate");
        assert_eq!(member(5).key(), &query_key!["member", 5]);
        assert_eq!(member(5).path(), "user/5");
        assert_eq!(members().path(), "user/members");
    }
}
