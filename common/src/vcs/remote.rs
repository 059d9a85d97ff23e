// Remote URL rewriting for token-authenticated pushes

use crate::errors::VcsError;
use reqwest::Url;

/// Username GitHub expects alongside an installation or personal access token
pub const TOKEN_USERNAME: &str = "x-access-token";

/// Return `remote` with `x-access-token:<token>` as its userinfo
///
/// Any existing credentials in the URL are replaced. Only `http` and `https`
/// remotes can carry a token; SSH and local remotes are rejected.
pub fn with_access_token(remote: &str, token: &str) -> Result<String, VcsError> {
    let mut url = Url::parse(remote.trim()).map_err(|_| {
        if remote.contains('@') || !remote.contains("://") {
            VcsError::UnsupportedRemote(remote.to_string())
        } else {
            VcsError::InvalidRemoteUrl {
                url: remote.to_string(),
                reason: "unparsable".to_string(),
            }
        }
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(VcsError::UnsupportedRemote(strip_credentials(&url)));
    }

    url.set_username(TOKEN_USERNAME)
        .and_then(|_| url.set_password(Some(token)))
        .map_err(|_| VcsError::InvalidRemoteUrl {
            url: strip_credentials(&url),
            reason: "URL cannot carry credentials".to_string(),
        })?;

    Ok(url.to_string())
}

fn strip_credentials(url: &Url) -> String {
    let mut clean = url.clone();
    let _ = clean.set_username("");
    let _ = clean.set_password(None);
    clean.to_string()
}
