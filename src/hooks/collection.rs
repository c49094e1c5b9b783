//! Collection, dropdown vocabulary, settings and the add/edit form.

use crate::error::Result;
use crate::http::RequestBody;
use crate::key::QueryKey;
use crate::models::{CollectionResponse, EnumsResponse, FragForm, SettingUpdate, Settings};
use crate::mutation::Mutation;
use crate::navigation::Route;
use crate::query::{QueryObserver, QueryOptions};
use crate::query_key;
use crate::resource::Resource;
use crate::service::BarcodeClient;
use reqwest::Method;

pub fn collection_key() -> QueryKey {
    query_key!["collection"]
}

pub fn settings_key() -> QueryKey {
    query_key!["settings"]
}

pub fn collection() -> Resource<CollectionResponse> {
    Resource::new(collection_key(), "dbtc/your-collection")
}

pub fn enums() -> Resource<EnumsResponse> {
    Resource::new(query_key!["enums"], "dbtc/enums")
}

pub fn settings() -> Resource<Settings> {
    Resource::new(settings_key(), "user/settings")
}

impl BarcodeClient {
    /// The signed-in member and the frags they own.
    pub fn collection(&self) -> QueryObserver<CollectionResponse> {
        self.observe(collection(), QueryOptions::default())
    }

    /// Coral types and marketplace flag for dropdowns.
    pub fn enums(&self) -> QueryObserver<EnumsResponse> {
        self.observe(enums(), QueryOptions::default())
    }

    pub fn settings(&self) -> QueryObserver<Settings> {
        self.observe(settings(), QueryOptions::default())
    }

    /// `PUT /user/settings/:key/:value`, then invalidate `["settings"]`.
    pub fn update_setting(&self) -> Mutation<SettingUpdate, ()> {
        let api = self.api().clone();
        Mutation::new(self.queries(), "update-setting", move |update: SettingUpdate| {
            let api = api.clone();
            async move {
                let url = api.endpoint(&["user", "settings", update.key.as_str(), update.value.as_str()])?;
                api.send_unit(Method::PUT, url, RequestBody::Empty).await
            }
        })
        .invalidates(|_| vec![settings_key()])
    }

    /// Multipart `POST /dbtc/add` for both add and edit.
    ///
    /// On success invalidates `["collection"]` and navigates to the collection view.
    pub fn save_frag(&self) -> Mutation<FragForm, ()> {
        let api = self.api().clone();
        let navigator = self.navigator().clone();
        Mutation::new(self.queries(), "save-frag", move |form: FragForm| {
            let api = api.clone();
            async move { submit_frag(&api, &form).await }
        })
        .invalidates(|_| vec![collection_key()])
        .on_success(move |_, _, _| navigator.navigate(Route::COLLECTION))
    }
}

async fn submit_frag(api: &crate::http::ApiClient, form: &FragForm) -> Result<()> {
    form.validate()?;
    let body = RequestBody::Multipart(form.to_multipart()?);
    api.request(Method::POST, "dbtc/add", body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors() {
        assert_eq!(collection().key(), &query_key!["collection"]);
        assert_eq!(collection().path(), "dbtc/your-collection");
        assert_eq!(enums().key(), &query_key!["enums"]);
        assert_eq!(settings().path(), "user/settings");
    }
}
