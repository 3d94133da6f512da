use crate::attachment::{Attachment, AttachmentResolver};
use crate::diagnostics::WarningSet;
use crate::document::Document;
use crate::motor::{Motor, MotorDescriptor, MotorFinder};

/// Everything a format loader needs for a single load: the document being
/// populated and the strategies for resolving what the document references.
///
/// Created fresh for every load and consumed when the load finishes.
pub struct LoadingContext<'a> {
    document: Document,
    motor_finder: &'a dyn MotorFinder,
    attachments: Box<dyn AttachmentResolver>,
}

impl<'a> LoadingContext<'a> {
    pub fn new(motor_finder: &'a dyn MotorFinder, attachments: Box<dyn AttachmentResolver>) -> Self {
        LoadingContext {
            document: Document::new(),
            motor_finder,
            attachments,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn find_motor(&self, descriptor: &MotorDescriptor, warnings: &mut WarningSet) -> Option<Motor> {
        self.motor_finder.find_motor(descriptor, warnings)
    }

    pub fn attachment(&self, name: &str) -> Attachment {
        self.attachments.attachment(name)
    }

    pub fn attachment_resolver(&self) -> &dyn AttachmentResolver {
        &*self.attachments
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

impl std::fmt::Debug for LoadingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingContext")
            .field("document", &self.document)
            .field("attachments", &self.attachments)
            .finish()
    }
}
