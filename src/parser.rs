use crate::document::{Document, Node};
use crate::element::Element;
use crate::error::{Error, Result};
use encoding_rs::{Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, Read};
use tracing::trace;

pub(crate) struct DecodeReader<R: Read> {
    decoder: Option<Decoder>,
    inner: R,
    undecoded: [u8; 4096],
    undecoded_pos: usize,
    undecoded_cap: usize,
    decoded: [u8; 12288],
    decoded_pos: usize,
    decoded_cap: usize,
    done: bool,
}

impl<R: Read> DecodeReader<R> {
    // If Decoder is not set, don't decode.
    pub(crate) fn new(reader: R, decoder: Option<Decoder>) -> DecodeReader<R> {
        DecodeReader {
            decoder,
            inner: reader,
            undecoded: [0; 4096],
            undecoded_pos: 0,
            undecoded_cap: 0,
            decoded: [0; 12288],
            decoded_pos: 0,
            decoded_cap: 0,
            done: false,
        }
    }

    pub(crate) fn set_decoder(&mut self, dec: Option<Decoder>) {
        self.decoder = dec;
        self.done = false;
    }

    fn fill_buf_decode(&mut self) -> std::io::Result<&[u8]> {
        while self.decoded_pos >= self.decoded_cap {
            if self.done && self.undecoded_pos >= self.undecoded_cap {
                return Ok(&[]);
            }
            let remaining = self.undecoded_cap - self.undecoded_pos;
            // A multi-byte sequence may be split at the end of the buffer.
            if remaining <= 32 && !self.done {
                self.undecoded
                    .copy_within(self.undecoded_pos..self.undecoded_cap, 0);
                let read = self.inner.read(&mut self.undecoded[remaining..])?;
                self.done = read == 0;
                self.undecoded_pos = 0;
                self.undecoded_cap = remaining + read;
            }
            let decoder = match self.decoder.as_mut() {
                Some(decoder) => decoder,
                None => return Ok(&[]),
            };
            let (_res, read, written, _replaced) = decoder.decode_to_utf8(
                &self.undecoded[self.undecoded_pos..self.undecoded_cap],
                &mut self.decoded,
                self.done,
            );
            self.undecoded_pos += read;
            self.decoded_cap = written;
            self.decoded_pos = 0;
        }
        Ok(&self.decoded[self.decoded_pos..self.decoded_cap])
    }

    fn fill_buf_without_decode(&mut self) -> std::io::Result<&[u8]> {
        if self.undecoded_pos >= self.undecoded_cap {
            self.undecoded_cap = self.inner.read(&mut self.undecoded)?;
            self.undecoded_pos = 0;
        }
        Ok(&self.undecoded[self.undecoded_pos..self.undecoded_cap])
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let available = self.fill_buf()?;
        let len = std::cmp::min(available.len(), buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.consume(len);
        Ok(len)
    }
}

impl<R: Read> BufRead for DecodeReader<R> {
    // Decoder may change from None to Some.
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match &self.decoder {
            Some(_) => self.fill_buf_decode(),
            None => self.fill_buf_without_decode(),
        }
    }
    fn consume(&mut self, amt: usize) {
        match &self.decoder {
            Some(_) => {
                self.decoded_pos = std::cmp::min(self.decoded_pos + amt, self.decoded_cap);
            }
            None => {
                self.undecoded_pos = std::cmp::min(self.undecoded_pos + amt, self.undecoded_cap);
            }
        }
    }
}

/// Options when parsing xml.
///
/// `empty_text_node`: `<tag></tag>` will have a `Node::Text("")` as its children, while `<tag />` won't.
///
/// `trim_text`: trims leading and trailing whitespace in text. Text that is empty after trimming is dropped.
///
/// `ignore_whitespace_only`: drops text that consists only of whitespace.
///
/// `require_decl`: fail with [`Error::MalformedXML`] if the document doesn't start with an XML declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    pub empty_text_node: bool,
    pub trim_text: bool,
    pub ignore_whitespace_only: bool,
    pub require_decl: bool,
}

impl Default for ReadOptions {
    fn default() -> ReadOptions {
        ReadOptions {
            empty_text_node: true,
            trim_text: true,
            ignore_whitespace_only: false,
            require_decl: false,
        }
    }
}

pub(crate) struct DocumentParser {
    document: Document,
    read_opts: ReadOptions,
    encoding: Option<String>,
    element_stack: Vec<Element>,
}

impl DocumentParser {
    pub(crate) fn parse_reader<R: Read>(reader: R, opts: ReadOptions) -> Result<Document> {
        let document = Document::new();
        let container = document.container();
        let mut parser = DocumentParser {
            document,
            read_opts: opts,
            encoding: None,
            element_stack: vec![container],
        };
        parser.parse_start(reader)?;
        Ok(parser.document)
    }

    fn handle_decl(&mut self, ev: &BytesDecl) -> Result<()> {
        self.document.version = String::from_utf8(ev.version()?.to_vec())?;
        self.encoding = match ev.encoding() {
            Some(res) => Some(String::from_utf8(res?.to_vec())?),
            None => None,
        };
        self.document.standalone = match ev.standalone() {
            Some(res) => {
                let val = std::str::from_utf8(&res?)?.to_lowercase();
                if val == "yes" {
                    true
                } else if val == "no" {
                    false
                } else {
                    return Err(Error::MalformedXML(
                        "Standalone Document Declaration has non boolean value".to_string(),
                    ));
                }
            }
            None => false,
        };
        Ok(())
    }

    fn current(&self) -> Result<Element> {
        self.element_stack
            .last()
            .copied()
            .ok_or_else(|| Error::MalformedXML("Closing tag without opening tag".to_string()))
    }

    fn handle_bytes_start(&mut self, ev: &BytesStart) -> Result<Element> {
        let parent = self.current()?;
        let doc = &mut self.document;
        let full_name = String::from_utf8(ev.name().to_vec())?;
        let element = Element::new_child(doc, parent, full_name);
        for attr in ev.attributes() {
            let attr = attr?;
            let key = String::from_utf8(attr.key.to_vec())?;
            let value = String::from_utf8(attr.unescaped_value()?.to_vec())?;
            if key == "xmlns" {
                element.mut_namespace_decls(doc).insert(String::new(), value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                element
                    .mut_namespace_decls(doc)
                    .insert(prefix.to_owned(), value);
            } else {
                element.mut_attributes(doc).insert(key, value);
            }
        }
        Ok(element)
    }

    fn push_text(&mut self, content: String) -> Result<()> {
        let parent = self.current()?;
        let content = if self.read_opts.trim_text {
            content.trim().to_string()
        } else {
            content
        };
        let whitespace_only = content.trim().is_empty();
        if content.is_empty()
            || (whitespace_only && (self.read_opts.ignore_whitespace_only || parent.is_container()))
        {
            return Ok(());
        }
        parent.push_child(&mut self.document, Node::Text(content))
    }

    fn push_node(&mut self, node: Node) -> Result<()> {
        let parent = self.current()?;
        parent.push_child(&mut self.document, node)
    }

    // Look at the document decl and figure out the document encoding
    fn parse_start<B: Read>(&mut self, reader: B) -> Result<()> {
        let mut bufreader = DecodeReader::new(reader, None);

        let bytes = bufreader.fill_buf()?;
        let init_encoding = match bytes {
            [0xfe, 0xff, ..] => {
                // UTF-16 BE BOM
                bufreader.consume(2);
                Some(UTF_16BE)
            }
            [0xff, 0xfe, ..] => {
                // UTF-16 LE BOM
                bufreader.consume(2);
                Some(UTF_16LE)
            }
            [0xef, 0xbb, 0xbf, ..] => {
                // UTF-8 BOM
                bufreader.consume(3);
                None
            }
            [0x00, 0x3c, 0x00, 0x3f, ..] => Some(UTF_16BE),
            [0x3c, 0x00, 0x3f, 0x00, ..] => Some(UTF_16LE),
            [0x3c, 0x3f, ..] => None,
            _ if self.read_opts.require_decl => {
                return Err(Error::MalformedXML(
                    "Didn't find XML Declaration at the start of file".to_string(),
                ))
            }
            // Without a declaration the document must be UTF-8.
            _ => None,
        };
        bufreader.set_decoder(init_encoding.map(|e| e.new_decoder_without_bom_handling()));
        let mut xmlreader = Reader::from_reader(bufreader);
        let mut buf = Vec::with_capacity(150);
        match xmlreader.read_event(&mut buf)? {
            Event::Decl(ev) => {
                self.handle_decl(&ev)?;
                if let Some(encoding_str) = &self.encoding {
                    let encoding =
                        Encoding::for_label(encoding_str.as_bytes()).ok_or(Error::CannotDecode)?;
                    let encoding = if encoding == UTF_8 {
                        None
                    } else {
                        Some(encoding)
                    };
                    // Encoding::for_label("UTF-16") defaults to UTF-16 LE, even though it could be UTF-16 BE
                    if encoding != init_encoding
                        && !(encoding == Some(UTF_16LE) && init_encoding == Some(UTF_16BE))
                    {
                        let mut decode_reader = xmlreader.into_underlying_reader();
                        decode_reader
                            .set_decoder(encoding.map(|e| e.new_decoder_without_bom_handling()));
                        xmlreader = Reader::from_reader(decode_reader);
                    }
                }
            }
            _ if self.read_opts.require_decl => {
                return Err(Error::MalformedXML(
                    "Didn't find XML Declaration at the start of file".to_string(),
                ));
            }
            event => {
                if self.handle_event(event)? {
                    return self.finish();
                }
            }
        }
        self.parse_content(xmlreader)
    }

    // Returns if document parsing is finished.
    fn handle_event(&mut self, event: Event) -> Result<bool> {
        trace!(?event, "xml event");
        match event {
            Event::Start(ref ev) => {
                let element = self.handle_bytes_start(ev)?;
                self.element_stack.push(element);
            }
            Event::End(_) => {
                if self.element_stack.len() <= 1 {
                    return Err(Error::MalformedXML(
                        "Closing tag without opening tag".to_string(),
                    ));
                }
                // quick-xml checks if tag names match for us
                let elem = self.current()?;
                self.element_stack.pop();
                // distinguish <tag></tag> and <tag />
                if self.read_opts.empty_text_node && !elem.has_children(&self.document) {
                    elem.push_child(&mut self.document, Node::Text(String::new()))?;
                }
            }
            Event::Empty(ref ev) => {
                self.handle_bytes_start(ev)?;
            }
            Event::Text(ev) => {
                let content = String::from_utf8(ev.unescaped()?.to_vec())?;
                self.push_text(content)?;
            }
            Event::DocType(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                self.push_node(Node::DocType(content))?;
            }
            // Comment, CData, and PI content is not escaped.
            Event::Comment(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                self.push_node(Node::Comment(content))?;
            }
            Event::CData(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                self.push_node(Node::CData(content))?;
            }
            Event::PI(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                self.push_node(Node::PI(content))?;
            }
            Event::Decl(ev) => {
                self.handle_decl(&ev)?;
            }
            Event::Eof => return Ok(true),
        }
        Ok(false)
    }

    fn parse_content<B: BufRead>(&mut self, mut reader: Reader<B>) -> Result<()> {
        let mut buf = Vec::with_capacity(200); // reduce time increasing capacity at start.
        loop {
            let ev = reader.read_event(&mut buf)?;
            if self.handle_event(ev)? {
                return self.finish();
            }
            buf.clear();
        }
    }

    fn finish(&self) -> Result<()> {
        if self.element_stack.len() > 1 {
            let open = self.current()?;
            return Err(Error::MalformedXML(format!(
                "Unclosed tag <{}>",
                open.full_name(&self.document)
            )));
        }
        Ok(())
    }
}
