use super::backend::DeviceError;
use crate::error::CaptureError;

/// Map a platform device error onto the capture error taxonomy
///
/// Pure function of the error name; the free-form message is only carried
/// through for the `Unknown` case.
pub fn classify(error: &DeviceError) -> CaptureError {
    match error.name.as_str() {
        "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
            CaptureError::PermissionDenied
        }
        "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError"
        | "ConstraintNotSatisfiedError" => CaptureError::DeviceNotFound,
        // Held by another application, or blocked by OS privacy settings
        "NotReadableError" | "TrackStartError" | "AbortError" => CaptureError::DeviceBusy,
        _ => {
            let detail = if error.message.is_empty() {
                error.name.clone()
            } else {
                error.to_string()
            };
            CaptureError::Unknown(detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(name: &str) -> DeviceError {
        DeviceError::new(name, "details")
    }

    #[test]
    fn permission_errors() {
        assert_eq!(classify(&err("NotAllowedError")), CaptureError::PermissionDenied);
        assert_eq!(classify(&err("PermissionDeniedError")), CaptureError::PermissionDenied);
        assert_eq!(classify(&err("SecurityError")), CaptureError::PermissionDenied);
    }

    #[test]
    fn missing_device_errors() {
        assert_eq!(classify(&err("NotFoundError")), CaptureError::DeviceNotFound);
        assert_eq!(classify(&err("DevicesNotFoundError")), CaptureError::DeviceNotFound);
        assert_eq!(classify(&err("OverconstrainedError")), CaptureError::DeviceNotFound);
    }

    #[test]
    fn busy_device_errors() {
        assert_eq!(classify(&err("NotReadableError")), CaptureError::DeviceBusy);
        assert_eq!(classify(&err("TrackStartError")), CaptureError::DeviceBusy);
    }

    #[test]
    fn unrecognised_error_keeps_details() {
        let classified = classify(&DeviceError::new("WeirdError", "driver crashed"));
        assert_eq!(
            classified,
            CaptureError::Unknown("WeirdError: driver crashed".to_string())
        );

        let bare = classify(&DeviceError::new("WeirdError", ""));
        assert_eq!(bare, CaptureError::Unknown("WeirdError".to_string()));
    }

    #[test]
    fn each_class_has_distinct_message() {
        let messages = [
            CaptureError::PermissionDenied.user_message(),
            CaptureError::DeviceNotFound.user_message(),
            CaptureError::DeviceBusy.user_message(),
            CaptureError::Unknown("x".into()).user_message(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
