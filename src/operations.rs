//! The closed set of blob operations an endpoint can execute.

use crate::options::string_enum;

string_enum! {
    /// Operation selector, resolved per call from the exchange headers or
    /// the endpoint configuration.
    BlobOperation {
        // Service level
        ListBlobContainers => "listBlobContainers",
        // Container level
        CreateBlobContainer => "createBlobContainer",
        DeleteBlobContainer => "deleteBlobContainer",
        ListBlobs => "listBlobs",
        // Blob level
        GetBlob => "getBlob",
        DeleteBlob => "deleteBlob",
        DownloadBlobToFile => "downloadBlobToFile",
        DownloadLink => "downloadLink",
        UploadBlockBlob => "uploadBlockBlob",
        StageBlockBlobList => "stageBlockBlobList",
        CommitBlobBlockList => "commitBlobBlockList",
        GetBlobBlockList => "getBlobBlockList",
        CreateAppendBlob => "createAppendBlob",
        CommitAppendBlob => "commitAppendBlob",
        CreatePageBlob => "createPageBlob",
        UploadPageBlob => "uploadPageBlob",
        ResizePageBlob => "resizePageBlob",
        ClearPageBlob => "clearPageBlob",
        GetPageBlobRanges => "getPageBlobRanges",
        CopyBlob => "copyBlob",
    }
}

impl Default for BlobOperation {
    fn default() -> Self {
        BlobOperation::ListBlobContainers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BlobError;

    #[test]
    fn test_parse_operation_names() {
        assert_eq!(
            "listBlobs".parse::<BlobOperation>().unwrap(),
            BlobOperation::ListBlobs
        );
        assert_eq!(
            "uploadpageblob".parse::<BlobOperation>().unwrap(),
            BlobOperation::UploadPageBlob
        );
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let err = "renameBlob".parse::<BlobOperation>().unwrap_err();
        assert!(matches!(err, BlobError::Configuration { .. }));
    }

    #[test]
    fn test_names_round_trip_for_every_operation() {
        assert_eq!(BlobOperation::ALL.len(), 20);
        for op in BlobOperation::ALL {
            assert_eq!(op.as_str().parse::<BlobOperation>().unwrap(), *op);
        }
    }

    #[test]
    fn test_default_operation() {
        assert_eq!(BlobOperation::default(), BlobOperation::ListBlobContainers);
    }
}
