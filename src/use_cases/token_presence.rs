//! Token presence use case
//!
//! A status query has three outcomes, not two: the token is usable, the
//! token is absent, or the token is attached but its OpenPGP application
//! refuses to answer. The last case is split further with a capability
//! probe into "hardware cannot do OpenPGP" and "OpenPGP not initialized".

use tracing::{debug, info, warn};

use crate::error::{TokenError, YkgpgError, YkgpgResult};
use crate::logic::openpgp_support;
use crate::model::{CardStatus, TokenPresence};
use crate::ports::{HostTools, KeyInspector};

/// Status-query error text meaning "a token is attached but OpenPGP is
/// not answering".
const BLOCKED_MARKERS: [&str; 2] = [
    "Operation not supported by device",
    "OpenPGP card not available",
];

const UNSUPPORTED_OPERATION: &str = "Operation not supported by device";

const SUPPORT_GUIDANCE: &str = "The device may not support OpenPGP (Security Key models do not), \
     or its OpenPGP application may not be initialized. Try 'gpg --card-status', or install \
     ykman and run 'ykman info'";

fn mentions(err: &YkgpgError, marker: &str) -> bool {
    err.to_string().contains(marker)
}

fn is_blocked(err: &YkgpgError) -> bool {
    BLOCKED_MARKERS.iter().any(|marker| mentions(err, marker))
}

/// Classify the attached token.
///
/// # Errors
///
/// - `TokenError::ProtocolUnsupported` when the token is attached but its
///   hardware has no OpenPGP application
/// - `TokenError::NotInitialized` when the token is attached and the
///   application exists (or support could not be decided) but is not set up
pub fn detect_token<D, H>(directory: &D, tools: &H) -> YkgpgResult<TokenPresence>
where
    D: KeyInspector + ?Sized,
    H: HostTools + ?Sized,
{
    let err = match directory.card_status() {
        Ok(card) => {
            info!(serial = %card.serial, "token detected");
            return Ok(TokenPresence::Ready(card));
        }
        Err(err) => err,
    };

    if err.is_timeout() {
        warn!(%err, "token status query timed out");
        return Ok(TokenPresence::Inconclusive);
    }

    if is_blocked(&err) {
        debug!(%err, "token attached but OpenPGP is not answering");
        return match supports_openpgp(directory, tools) {
            Ok(false) => Err(TokenError::ProtocolUnsupported.into()),
            Ok(true) | Err(_) => Err(TokenError::NotInitialized.into()),
        };
    }

    debug!(%err, "no token");
    Ok(TokenPresence::Absent)
}

/// Like [`detect_token`], but only a usable token is success.
pub fn require_token<D, H>(directory: &D, tools: &H) -> YkgpgResult<CardStatus>
where
    D: KeyInspector + ?Sized,
    H: HostTools + ?Sized,
{
    match detect_token(directory, tools)? {
        TokenPresence::Ready(card) => Ok(card),
        TokenPresence::Absent => Err(TokenError::NotDetected.into()),
        TokenPresence::Inconclusive => Err(TokenError::Inconclusive.into()),
    }
}

/// Decide whether the attached token has an OpenPGP application.
///
/// The inventory tool is asked first; when it is missing or says nothing
/// about OpenPGP, a successful status query counts as support.
///
/// # Errors
///
/// `TokenError::SupportUnknown` when no signal decides either way, and
/// `TokenError::ProbeFailed` when the status query fails for another
/// reason.
pub fn supports_openpgp<D, H>(directory: &D, tools: &H) -> YkgpgResult<bool>
where
    D: KeyInspector + ?Sized,
    H: HostTools + ?Sized,
{
    match tools.token_inventory() {
        Ok(inventory) => {
            if let Some(supported) = openpgp_support(&inventory) {
                debug!(supported, "inventory reports OpenPGP state");
                return Ok(supported);
            }
            debug!("inventory does not mention OpenPGP");
        }
        Err(err) => debug!(%err, "inventory tool unavailable"),
    }

    match directory.card_status() {
        Ok(_) => Ok(true),
        Err(err) if mentions(&err, UNSUPPORTED_OPERATION) => Err(TokenError::SupportUnknown {
            guidance: SUPPORT_GUIDANCE.to_string(),
        }
        .into()),
        Err(err) => Err(TokenError::ProbeFailed {
            reason: err.to_string(),
        }
        .into()),
    }
}
