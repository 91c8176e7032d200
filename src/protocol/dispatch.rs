//! Routing of decoded requests to the bridge service

use super::messages::{Reply, Request, Response};
use crate::service::BridgeService;
use crate::traits::FileSystem;

/// Execute one request against `service`
///
/// Blocks on filesystem I/O. Every request yields exactly one response;
/// unsupported operations (including the legacy single `close`) are answered
/// with [`crate::ServiceError::Unsupported`].
pub fn dispatch<F: FileSystem>(service: &BridgeService<F>, request: Request) -> Response {
    match request {
        Request::Open { path } => service.open(&path).map(Reply::Handle),
        Request::Create { path } => service.create(&path).map(Reply::Handle),
        Request::Read {
            handle,
            offset,
            size,
        } => service.read(handle, offset, size).map(Reply::Data),
        Request::Write { handle, data } => service.write(handle, &data).map(Reply::Bool),
        Request::CloseReadHandle { handle } => Ok(Reply::Bool(service.close_read(handle))),
        Request::CloseWriteHandle { handle } => Ok(Reply::Bool(service.close_write(handle))),
        Request::ListStatus { path } => service.list_status(&path).map(Reply::Statuses),
        Request::GetFileBlockLocations {
            path,
            start,
            length,
        } => service
            .get_file_block_locations(&path, start, length)
            .map(Reply::Blocks),
        unsupported => service.unsupported(unsupported.operation()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LocalFileSystem;
    use crate::error::ServiceError;
    use crate::namespace::FsEndpoint;
    use tempfile::TempDir;

    fn service() -> (TempDir, BridgeService<LocalFileSystem>) {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new(FsEndpoint::new("localhost", 8020), temp_dir.path());
        (temp_dir, BridgeService::new(fs))
    }

    #[test]
    fn test_unsupported_family() {
        let (_temp_dir, service) = service();
        let requests = vec![
            Request::Close { handle: 1 },
            Request::Append { path: "/a".into() },
            Request::Chmod {
                path: "/a".into(),
                mode: 0o644,
            },
            Request::Chown {
                path: "/a".into(),
                owner: "u".into(),
                group: "g".into(),
            },
            Request::CreateFile {
                path: "/a".into(),
                mode: 0o644,
                overwrite: true,
                buffer_size: 4096,
                block_replication: 1,
                block_size: 1024,
            },
            Request::Exists { path: "/a".into() },
            Request::Mkdirs { path: "/a".into() },
            Request::Rename {
                path: "/a".into(),
                dest: "/b".into(),
            },
            Request::Rm {
                path: "/a".into(),
                recursive: true,
            },
            Request::SetInactivityTimeoutPeriod {
                period_in_seconds: 10,
            },
            Request::SetReplication {
                path: "/a".into(),
                replication: 3,
            },
            Request::Shutdown { status: 0 },
            Request::Stat { path: "/a".into() },
        ];

        for request in requests {
            let operation = request.operation();
            assert_eq!(
                dispatch(&service, request),
                Err(ServiceError::Unsupported(operation.to_string()))
            );
        }
        assert_eq!(service.stats().errors(), 13);
    }

    #[test]
    fn test_create_write_close_round_trip() {
        let (temp_dir, service) = service();
        let Ok(Reply::Handle(handle)) = dispatch(
            &service,
            Request::Create {
                path: "/x".into(),
            },
        ) else {
            panic!("create did not return a handle");
        };

        assert_eq!(
            dispatch(
                &service,
                Request::Write {
                    handle,
                    data: b"hello".to_vec()
                }
            ),
            Ok(Reply::Bool(true))
        );
        assert_eq!(
            dispatch(&service, Request::CloseWriteHandle { handle }),
            Ok(Reply::Bool(true))
        );
        assert_eq!(std::fs::read(temp_dir.path().join("x")).unwrap(), b"hello");
    }

    #[test]
    fn test_list_missing_is_none() {
        let (_temp_dir, service) = service();
        assert_eq!(
            dispatch(
                &service,
                Request::ListStatus {
                    path: "/missing".into()
                }
            ),
            Ok(Reply::Statuses(None))
        );
    }
}
