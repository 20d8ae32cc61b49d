//! crates/study_hub_core/src/users.rs
//!
//! Profile documents in the `users` collection.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::doubts::require_non_empty;
use crate::domain::{UserProfile, UserProfileUpdate};
use crate::ports::{Clock, PortResult, UserStore};
use crate::storage::{upload_path, StorageUploader, PROFILE_PICTURES_FOLDER};

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get(&self, uid: Uuid) -> PortResult<Option<UserProfile>> {
        self.store.get_user_profile(uid).await
    }

    /// Writes a fresh profile. Missing fields are stored as absent and
    /// karma starts at zero unless given.
    pub async fn create(&self, uid: Uuid, data: UserProfileUpdate) -> PortResult<UserProfile> {
        let profile = UserProfile {
            uid,
            display_name: data.display_name,
            email: data.email,
            profile_picture_url: data.profile_picture_url,
            class: data.class,
            semester: data.semester,
            karma_points: data.karma_points.unwrap_or(0),
        };
        self.store.put_user_profile(profile.clone()).await?;
        info!(%uid, "User profile created");
        Ok(profile)
    }

    /// Fails with `NotFound` when the profile has not been set up yet.
    pub async fn update(&self, uid: Uuid, data: UserProfileUpdate) -> PortResult<()> {
        if let Some(name) = &data.display_name {
            require_non_empty("display name", name)?;
        }
        self.store.update_user_profile(uid, data).await
    }

    /// Uploads a new profile picture and points the profile at it.
    pub async fn set_profile_picture(
        &self,
        uploader: &StorageUploader,
        uid: Uuid,
        original_file_name: &str,
        data: Bytes,
    ) -> PortResult<String> {
        require_non_empty("file name", original_file_name)?;
        let path = upload_path(
            PROFILE_PICTURES_FOLDER,
            uid,
            self.clock.now(),
            original_file_name,
        );
        let url = uploader.upload(data, &path).await?;
        self.store
            .update_user_profile(
                uid,
                UserProfileUpdate {
                    profile_picture_url: Some(url.clone()),
                    ..UserProfileUpdate::default()
                },
            )
            .await?;
        Ok(url)
    }
}
