use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, SignupRequest, UpdateProfileImageRequest, UploadResponse},
        password, token,
    },
    error::ApiError,
    state::AppState,
    users::UserRecord,
};

// A body that fails to parse rides the generic 500 error path, like any
// other handler failure.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(payload) = payload.map_err(anyhow::Error::new)?;
    Ok(payload)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let payload = body(payload)?;

    let (salt, password_hash) = password::hash(&payload.password);
    let record = UserRecord {
        email: payload.email,
        name: payload.name,
        password_hash,
        salt,
        // Derived from the filename up front; nothing guarantees the client
        // ever completes the upload the presigned URL allows.
        profile_image_url: state.objects.object_url(&payload.filename),
        created_at: token::now_iso8601()?,
    };

    // Overwrite-or-create: a signup for an existing email replaces the
    // record without complaint.
    state.users.put_user(&record).await?;

    let upload_url = state
        .objects
        .presign_upload(
            &payload.filename,
            &payload.content_type,
            state.config.upload_ttl_secs,
        )
        .await?;

    info!(email = %record.email, "user signed up");
    Ok(Json(UploadResponse { upload_url }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let payload = body(payload)?;

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if password::hash_with_salt(&payload.password, &user.salt) != user.password_hash {
        warn!(email = %payload.email, "login password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let token = token::issue(&user.email)?;

    info!(email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful",
        email: user.email,
        profile_image_url: user.profile_image_url,
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile_image(
    State(state): State<AppState>,
    payload: Result<Json<UpdateProfileImageRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let payload = body(payload)?;

    // The old object goes first; the steps below have no rollback, so any
    // failure past this point leaves the record pointing at a deleted key.
    state.objects.delete_object(&payload.old_image_key).await?;

    let upload_url = match state
        .objects
        .presign_upload(
            &payload.new_filename,
            &payload.new_content_type,
            state.config.upload_ttl_secs,
        )
        .await
    {
        Ok(url) => url,
        Err(e) => {
            error!(
                email = %payload.email,
                old_key = %payload.old_image_key,
                "presign failed after old image delete; record still references the deleted object"
            );
            return Err(e.into());
        }
    };

    let new_url = state.objects.object_url(&payload.new_filename);
    if let Err(e) = state.users.set_profile_image(&payload.email, &new_url).await {
        error!(
            email = %payload.email,
            new_key = %payload.new_filename,
            "record update failed; old image deleted and upload URL already issued"
        );
        return Err(e.into());
    }

    info!(email = %payload.email, new_key = %payload.new_filename, "profile image updated");
    Ok(Json(UploadResponse { upload_url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserStore;
    use axum::extract::State;

    fn signup_request() -> SignupRequest {
        SignupRequest {
            email: "a@b.com".into(),
            name: "A".into(),
            password: "pw1".into(),
            filename: "img1.png".into(),
            content_type: "image/png".into(),
        }
    }

    #[tokio::test]
    async fn signup_then_login_roundtrip() {
        let state = AppState::fake();

        let res = signup(State(state.clone()), Ok(Json(signup_request())))
            .await
            .unwrap();
        assert!(res.0.upload_url.contains("img1.png"));

        let res = login(
            State(state),
            Ok(Json(LoginRequest {
                email: "a@b.com".into(),
                password: "pw1".into(),
            })),
        )
        .await
        .unwrap();
        assert_eq!(res.0.message, "Login successful");
        assert_eq!(res.0.email, "a@b.com");
        assert_eq!(res.0.profile_image_url, "https://fake.local/img1.png");
        assert!(!res.0.token.is_empty());
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let state = AppState::fake();
        signup(State(state.clone()), Ok(Json(signup_request())))
            .await
            .unwrap();

        let err = login(
            State(state.clone()),
            Ok(Json(LoginRequest {
                email: "a@b.com".into(),
                password: "pw2".into(),
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let err = login(
            State(state),
            Ok(Json(LoginRequest {
                email: "nobody@b.com".into(),
                password: "pw1".into(),
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn update_profile_image_rewrites_record_url() {
        let state = AppState::fake();
        signup(State(state.clone()), Ok(Json(signup_request())))
            .await
            .unwrap();

        let res = update_profile_image(
            State(state.clone()),
            Ok(Json(UpdateProfileImageRequest {
                email: "a@b.com".into(),
                old_image_key: "img1.png".into(),
                new_filename: "img2.png".into(),
                new_content_type: "image/png".into(),
            })),
        )
        .await
        .unwrap();
        assert!(res.0.upload_url.contains("img2.png"));

        let user = state
            .users
            .find_by_email("a@b.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.profile_image_url, "https://fake.local/img2.png");
    }
}
