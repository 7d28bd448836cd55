//! Stable header names.
//!
//! Every header the crate reads or writes is [`HEADER_PREFIX`] followed by a
//! descriptive suffix, so routes can address individual request options and
//! result fields by name.

/// Common prefix of every header name.
pub const HEADER_PREFIX: &str = "AzureStorageBlob";

macro_rules! header {
    ($(#[$meta:meta])* $name:ident = $suffix:literal) => {
        $(#[$meta])*
        pub const $name: &str = concat!("AzureStorageBlob", $suffix);
    };
}

// -- Request options -----------------------------------------------------------

header!(/// Operation to execute.
    OPERATION = "Operation");
header!(BLOB_CONTAINER_NAME = "BlobContainerName");
header!(BLOB_NAME = "BlobName");
header!(BLOB_TYPE = "BlobType");
header!(/// Listing filter by name prefix; ignored when [`REGEX`] is set.
    PREFIX = "Prefix");
header!(/// Listing filter by full-match regular expression.
    REGEX = "Regex");
header!(MAX_RESULTS_PER_PAGE = "MaxResultsPerPage");
header!(LIST_BLOBS_OPTIONS = "ListBlobOptions");
header!(LIST_BLOB_CONTAINERS_OPTIONS = "ListBlobContainersOptions");
header!(/// Per-call service timeout.
    TIMEOUT = "Timeout");
header!(PUBLIC_ACCESS_TYPE = "PublicAccessType");
header!(BLOB_REQUEST_CONDITION = "RequestCondition");
header!(BLOB_HTTP_HEADERS = "HttpHeaders");
header!(/// Page range (start/end) for page blob writes and range derivation.
    PAGE_BLOB_RANGE = "PageBlobRange");
header!(BLOB_OFFSET = "BlobOffset");
header!(DATA_COUNT = "DataCount");
header!(COMMIT_BLOCK_LIST_LATER = "CommitBlockListLater");
header!(CREATE_APPEND_BLOB = "CreateAppendBlob");
header!(CREATE_PAGE_BLOB = "CreatePageBlob");
header!(BLOCK_LIST_TYPE = "BlockListType");
header!(DELETE_SNAPSHOT_OPTION_TYPE = "DeleteSnapshotOptionType");
header!(FILE_DIR = "FileDir");
header!(DOWNLOAD_LINK_EXPIRATION = "DownloadLinkExpiration");
header!(SOURCE_BLOB_ACCOUNT_NAME = "SourceBlobAccountName");
header!(SOURCE_BLOB_CONTAINER_NAME = "SourceBlobContainerName");
header!(LEASE_ID = "LeaseId");

// -- Request options that are also result fields --------------------------------

header!(METADATA = "Metadata");
header!(ACCESS_TIER = "AccessTier");
header!(CONTENT_MD5 = "ContentMD5");
header!(PAGE_BLOB_SIZE = "PageBlobSize");
header!(BLOB_SEQUENCE_NUMBER = "BlobSequenceNumber");

// -- Result fields ----------------------------------------------------------------

header!(E_TAG = "ETag");
header!(LAST_MODIFIED = "LastModified");
header!(CREATION_TIME = "CreationTime");
header!(CONTENT_TYPE = "ContentType");
header!(CONTENT_ENCODING = "ContentEncoding");
header!(CONTENT_DISPOSITION = "ContentDisposition");
header!(CONTENT_LANGUAGE = "ContentLanguage");
header!(CACHE_CONTROL = "CacheControl");
header!(BLOB_SIZE = "BlobSize");
header!(LEASE_STATUS = "LeaseStatus");
header!(LEASE_STATE = "LeaseState");
header!(LEASE_DURATION = "LeaseDuration");
header!(COPY_ID = "CopyId");
header!(COPY_STATUS = "CopyStatus");
header!(COPY_SOURCE = "CopySource");
header!(COPY_PROGRESS = "CopyProgress");
header!(COPY_COMPLETION_TIME = "CopyCompletionTime");
header!(COPY_STATUS_DESCRIPTION = "CopyStatusDescription");
header!(SERVER_ENCRYPTED = "ServerEncrypted");
header!(ENCRYPTION_KEY_SHA_256 = "EncryptionKeySha256");
header!(ENCRYPTION_SCOPE = "EncryptionScope");
header!(ACCESS_TIER_INHERITED = "AccessTierInherited");
header!(ARCHIVE_STATUS = "ArchiveStatus");
header!(ACCESS_TIER_CHANGE_TIME = "AccessTierChangeTime");
header!(COMMITTED_BLOCK_COUNT = "CommittedBlockCount");
header!(APPEND_OFFSET = "AppendOffset");
header!(VERSION_ID = "VersionId");
header!(RAW_HTTP_HEADERS = "RawHttpHeaders");
header!(FILE_NAME = "FileName");
header!(DOWNLOAD_LINK = "DownloadLink");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_share_prefix() {
        for name in [OPERATION, BLOB_SIZE, CONTENT_TYPE, DOWNLOAD_LINK, REGEX] {
            assert!(name.starts_with(HEADER_PREFIX), "{name}");
        }
    }

    #[test]
    fn test_documented_names() {
        assert_eq!(BLOB_SIZE, "AzureStorageBlobBlobSize");
        assert_eq!(CONTENT_TYPE, "AzureStorageBlobContentType");
        assert_eq!(E_TAG, "AzureStorageBlobETag");
    }
}
